//! Error types for plugin resolution, download and installation.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KpmError>;

/// Errors raised by the installer engine.
#[derive(Error, Debug)]
pub enum KpmError {
    /// No artifact coordinates could be determined for the plugin.
    #[error("unable to resolve artifact coordinates for plugin '{plugin_key}' (host version {host_version})")]
    Resolution {
        plugin_key: String,
        host_version: String,
    },

    /// Every candidate repository was tried without success.
    #[error(
        "artifact not found for plugin '{plugin_key}': host version {host_version}, groupId {group_id}, artifactId {artifact_id}, version {version}"
    )]
    ArtifactNotFound {
        plugin_key: String,
        host_version: String,
        group_id: String,
        artifact_id: String,
        version: String,
    },

    /// Downloaded file is not a readable archive, or its checksum did not match.
    #[error("integrity check failed for {artifact}: {reason}")]
    Integrity { artifact: String, reason: String },

    #[error("failed to install plugin '{plugin_key}' version {}", .version.as_deref().unwrap_or("unknown"))]
    InstallOperation {
        plugin_key: String,
        version: Option<String>,
        #[source]
        source: Box<KpmError>,
    },

    #[error("failed to uninstall plugin '{plugin_key}' version {}", .version.as_deref().unwrap_or("all"))]
    UninstallOperation {
        plugin_key: String,
        version: Option<String>,
        #[source]
        source: Box<KpmError>,
    },

    /// Static configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A broadcast command could not be decoded.
    #[error("invalid plugin command: {0}")]
    InvalidCommand(String),

    #[error("HTTP request failed: {url} ({status})")]
    HttpStatus { url: String, status: u16 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A remote or local metadata document could not be parsed.
    #[error("malformed metadata from {origin}: {reason}")]
    Metadata { origin: String, reason: String },

    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KpmError {
    pub fn install(plugin_key: &str, version: Option<&str>, source: KpmError) -> Self {
        KpmError::InstallOperation {
            plugin_key: plugin_key.to_string(),
            version: version.map(str::to_string),
            source: Box::new(source),
        }
    }

    pub fn uninstall(plugin_key: &str, version: Option<&str>, source: KpmError) -> Self {
        KpmError::UninstallOperation {
            plugin_key: plugin_key.to_string(),
            version: version.map(str::to_string),
            source: Box::new(source),
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KpmError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn metadata(origin: impl Into<String>, reason: impl ToString) -> Self {
        KpmError::Metadata {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// Innermost error of an install/uninstall wrapper, or `self` otherwise
    pub fn root_cause(&self) -> &KpmError {
        match self {
            KpmError::InstallOperation { source, .. }
            | KpmError::UninstallOperation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
