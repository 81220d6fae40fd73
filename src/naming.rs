// Naming conventions for plugin directories, versions and archive files

use crate::constants::{DEFAULT_VERSION, PACKAGING, PLUGIN_SUFFIX};
use regex::Regex;

lazy_static::lazy_static! {
    static ref VERSION_PATTERN: Regex =
        Regex::new(r"(\d+[1-9]*)\.(\d+)\.(\d+)(?:-([a-zA-Z0-9]+))?")
            .expect("version pattern is a valid regex");
}

const SNAPSHOT_SUFFIXES: [&str; 2] = ["--snapshot", "-snapshot"];

/// Names derived from a plugin key and a raw version string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginNaming {
    pub plugin_name: String,
    pub version: String,
    pub archive_file_name: String,
}

impl PluginNaming {
    /// Derive all names at once. `fallback_source` (typically a download URI)
    /// is searched for a version when `raw_version` carries none.
    pub fn new(plugin_key: &str, raw_version: &str, fallback_source: Option<&str>) -> Self {
        let version = canonical_version(raw_version, fallback_source);
        let archive_file_name = archive_file_name(plugin_key, &version);
        Self {
            plugin_name: plugin_name(plugin_key),
            version,
            archive_file_name,
        }
    }
}

/// `stripe` -> `stripe-plugin`
pub fn plugin_name(plugin_key: &str) -> String {
    format!("{}{}", plugin_key, PLUGIN_SUFFIX)
}

/// Extract a `MAJOR.MINOR.PATCH[-TAG]` version, dropping any snapshot marker.
///
/// Never fails: input without a recognisable version yields `0.0.0`.
pub fn canonical_version(raw: &str, fallback_source: Option<&str>) -> String {
    let found = VERSION_PATTERN
        .find(raw)
        .or_else(|| fallback_source.and_then(|source| VERSION_PATTERN.find(source)));

    match found {
        Some(m) => strip_snapshot(m.as_str()).to_string(),
        None => DEFAULT_VERSION.to_string(),
    }
}

/// `stripe`, `1.2.3-SNAPSHOT` -> `stripe-plugin-1.2.3.jar`
pub fn archive_file_name(plugin_key: &str, version: &str) -> String {
    format!(
        "{}-{}.{}",
        plugin_name(plugin_key),
        canonical_version(version, None),
        PACKAGING
    )
}

fn strip_snapshot(version: &str) -> &str {
    let lower = version.to_ascii_lowercase();
    for suffix in SNAPSHOT_SUFFIXES {
        if lower.ends_with(suffix) {
            return &version[..version.len() - suffix.len()];
        }
    }
    version
}
