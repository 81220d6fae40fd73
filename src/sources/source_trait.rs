// Lookup traits consulted during artifact resolution

use crate::error::Result;
use crate::identifiers::IdentifierRecord;
use async_trait::async_trait;

/// One plugin-directory answer for a given host version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub plugin_key: String,
    /// Host version prefix this entry was listed under (e.g. `0.24`)
    pub compatible_prefix: String,
    pub version: String,
    pub artifact_id: Option<String>,
}

/// Local record of previously installed coordinates
pub trait IdentifierLookup: Send + Sync {
    fn lookup(&self, plugin_key: &str) -> Result<Option<IdentifierRecord>>;
}

/// Remote directory of plugins compatible with a host version
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Entry for `plugin_key` compatible with `host_version`
    ///
    /// # Arguments
    /// * `host_version` - Version of the running host, matched by prefix
    /// * `plugin_key` - Plugin to look up
    /// * `force_refresh` - Skip cached listings for this call
    async fn lookup(
        &self,
        host_version: &str,
        plugin_key: &str,
        force_refresh: bool,
    ) -> Result<Option<DirectoryEntry>>;
}
