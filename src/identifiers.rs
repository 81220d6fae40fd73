// Identifier store: durable plugin key -> coordinates mapping

use crate::constants::{IDENTIFIERS_FILE, PACKAGING, PLUGINS_DIR};
use crate::coordinate::PluginKind;
use crate::error::{KpmError, Result};
use crate::naming;
use crate::sources::IdentifierLookup;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    pub plugin_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    pub version: String,
    #[serde(default = "default_packaging")]
    pub packaging: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_packaging() -> String {
    PACKAGING.to_string()
}

fn default_language() -> String {
    PluginKind::Java.as_str().to_string()
}

impl IdentifierRecord {
    pub fn new(
        plugin_key: &str,
        group_id: Option<String>,
        artifact_id: Option<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: naming::plugin_name(plugin_key),
            group_id,
            artifact_id,
            version: version.into(),
            packaging: default_packaging(),
            language: default_language(),
        }
    }
}

/// Whole-document JSON store under `<bundles_root>/plugins/`.
///
/// Every write reads the full document, mutates it and rewrites it. The
/// internal lock serialises those cycles within one process only.
#[derive(Debug)]
pub struct IdentifierStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl IdentifierStore {
    pub fn open(bundles_root: &Path) -> Self {
        Self::at(bundles_root.join(PLUGINS_DIR).join(IDENTIFIERS_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records; a missing document reads as empty
    pub fn list(&self) -> Result<BTreeMap<String, IdentifierRecord>> {
        let _guard = self.lock.lock();
        self.load()
    }

    pub fn get(&self, plugin_key: &str) -> Result<Option<IdentifierRecord>> {
        Ok(self.list()?.remove(plugin_key))
    }

    /// Create or overwrite the record for `plugin_key`
    pub fn add(&self, plugin_key: &str, record: IdentifierRecord) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        debug!("Recording identifier {} -> {:?}", plugin_key, record);
        records.insert(plugin_key.to_string(), record);
        self.save(&records)
    }

    /// Forget `plugin_key`, returning the record that was removed
    pub fn remove(&self, plugin_key: &str) -> Result<Option<IdentifierRecord>> {
        let _guard = self.lock.lock();
        let mut records = self.load()?;
        let removed = records.remove(plugin_key);
        if removed.is_some() {
            debug!("Forgetting identifier {}", plugin_key);
            self.save(&records)?;
        }
        Ok(removed)
    }

    fn load(&self) -> Result<BTreeMap<String, IdentifierRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(KpmError::fs(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text)
            .map_err(|e| KpmError::metadata(self.path.display().to_string(), e))
    }

    fn save(&self, records: &BTreeMap<String, IdentifierRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| KpmError::fs(parent, e))?;
        }
        let text = serde_json::to_string_pretty(records)
            .map_err(|e| KpmError::metadata(self.path.display().to_string(), e))?;
        fs::write(&self.path, text).map_err(|e| KpmError::fs(&self.path, e))
    }
}

impl IdentifierLookup for IdentifierStore {
    fn lookup(&self, plugin_key: &str) -> Result<Option<IdentifierRecord>> {
        self.get(plugin_key)
    }
}
