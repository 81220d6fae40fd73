// Plugin identity and artifact coordinates

use crate::constants::PACKAGING;
use crate::error::{KpmError, Result};
use std::fmt;

/// Kind of plugin, which selects the `plugins/<kind>/` directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PluginKind {
    #[default]
    Java,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Java => "java",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "java" => Ok(PluginKind::Java),
            other => Err(KpmError::InvalidCommand(format!(
                "unsupported plugin type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested plugin, possibly missing the coordinates that resolution fills in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginCoordinate {
    pub plugin_key: String,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub kind: PluginKind,
}

impl PluginCoordinate {
    pub fn new(plugin_key: impl Into<String>) -> Self {
        Self {
            plugin_key: plugin_key.into(),
            ..Default::default()
        }
    }

    pub fn with_group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = non_empty(group_id);
        self
    }

    pub fn with_artifact_id(mut self, artifact_id: Option<String>) -> Self {
        self.artifact_id = non_empty(artifact_id);
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = non_empty(version);
        self
    }

    pub fn with_classifier(mut self, classifier: Option<String>) -> Self {
        self.classifier = non_empty(classifier);
        self
    }

    pub fn packaging(&self) -> &'static str {
        PACKAGING
    }

    pub fn is_resolved(&self) -> bool {
        self.artifact_id.is_some() && self.version.is_some()
    }
}

/// Reject plugin keys that could not be used as a single path segment
pub fn check_plugin_key(plugin_key: &str) -> Result<()> {
    let invalid = plugin_key.trim().is_empty()
        || plugin_key.contains(['/', '\\', '\0'])
        || plugin_key.contains("..");
    if invalid {
        return Err(KpmError::InvalidCommand(format!(
            "invalid plugin key '{}'",
            plugin_key.escape_debug()
        )));
    }
    Ok(())
}

/// Blank strings count as absent everywhere coordinates are compared
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
