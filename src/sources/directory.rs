// Remote plugin directory: plugin key -> compatible versions per host version
//
// The listing is YAML, possibly multi-document:
//
//   :stripe:
//     :type: :java
//     :artifact_id: stripe-plugin
//     :versions:
//       :0.22: 7.0.4
//       :0.24: 8.0.0

use crate::error::{KpmError, Result};
use crate::sources::metadata::MetadataClient;
use crate::sources::source_trait::{DirectoryEntry, DirectoryLookup};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Host version prefix -> plugin version
    pub versions: BTreeMap<String, String>,
    pub artifact_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    plugins: BTreeMap<String, DirectoryRecord>,
}

impl DirectoryListing {
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn record(&self, plugin_key: &str) -> Option<&DirectoryRecord> {
        self.plugins.get(plugin_key)
    }

    /// Entry for `plugin_key` compatible with `host_version`. When several
    /// prefixes match, the longest one wins.
    pub fn entry_for(&self, plugin_key: &str, host_version: &str) -> Option<DirectoryEntry> {
        let record = self.plugins.get(plugin_key)?;
        record
            .versions
            .iter()
            .filter(|(prefix, _)| host_version.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, version)| DirectoryEntry {
                plugin_key: plugin_key.to_string(),
                compatible_prefix: prefix.clone(),
                version: version.clone(),
                artifact_id: record.artifact_id.clone(),
            })
    }

    /// All entries compatible with `host_version`
    pub fn compatible_entries(&self, host_version: &str) -> Vec<DirectoryEntry> {
        self.plugins
            .keys()
            .filter_map(|key| self.entry_for(key, host_version))
            .collect()
    }
}

/// Parse every YAML document in `text`; later documents override earlier ones per plugin
pub fn parse_listing(origin: &str, text: &str) -> Result<DirectoryListing> {
    let mut listing = DirectoryListing::default();

    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|e| KpmError::metadata(origin, e))?;
        let plugins = match value {
            Value::Mapping(plugins) => plugins,
            Value::Null => continue,
            _ => {
                return Err(KpmError::metadata(
                    origin,
                    "top level of a plugin directory document must be a mapping",
                ));
            }
        };

        for (key, entry) in plugins {
            let Some(plugin_key) = scalar(&key) else {
                continue;
            };
            let Value::Mapping(entry) = entry else {
                debug!("Skipping malformed directory entry for {}", plugin_key);
                continue;
            };
            listing.plugins.insert(plugin_key, parse_record(&entry));
        }
    }

    Ok(listing)
}

fn parse_record(entry: &Mapping) -> DirectoryRecord {
    let versions = match field(entry, "versions") {
        Some(Value::Mapping(versions)) => versions
            .iter()
            .filter_map(|(prefix, version)| Some((scalar(prefix)?, scalar(version)?)))
            .collect(),
        _ => BTreeMap::new(),
    };
    let artifact_id = field(entry, "artifact_id").and_then(scalar);
    DirectoryRecord {
        versions,
        artifact_id,
    }
}

/// Keys appear either bare or as Ruby symbols (`:versions`)
fn field<'a>(entry: &'a Mapping, name: &str) -> Option<&'a Value> {
    entry
        .get(format!(":{}", name).as_str())
        .or_else(|| entry.get(name))
}

fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let text = text.trim_start_matches(':').trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Directory lookups backed by the cached remote listing
pub struct PluginDirectory {
    metadata: Arc<MetadataClient>,
    url: String,
}

impl PluginDirectory {
    pub fn new(metadata: Arc<MetadataClient>, url: impl Into<String>) -> Self {
        Self {
            metadata,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DirectoryLookup for PluginDirectory {
    async fn lookup(
        &self,
        host_version: &str,
        plugin_key: &str,
        force_refresh: bool,
    ) -> Result<Option<DirectoryEntry>> {
        let listing = self
            .metadata
            .fetch_plugin_directory(&self.url, force_refresh)
            .await?;
        Ok(listing.entry_for(plugin_key, host_version))
    }
}
