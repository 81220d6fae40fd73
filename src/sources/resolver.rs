// Artifact resolution: which (artifactId, version) to fetch for a plugin key
//
// Sources are consulted in order and never overwrite a field an earlier
// source already set:
//   1. caller-supplied coordinates (returned verbatim when complete)
//   2. the local identifier store (skipped on force_refresh)
//   3. the remote plugin directory for the host version
//   4. the naming convention for the artifact id

use crate::coordinate::non_empty;
use crate::naming;
use crate::sources::source_trait::{DirectoryLookup, IdentifierLookup};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Only known when the identifier store supplied it
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: String,
}

#[derive(Debug, Default)]
struct Partial {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
}

impl Partial {
    fn fill(&mut self, group_id: Option<String>, artifact_id: Option<String>, version: Option<String>) {
        if self.group_id.is_none() {
            self.group_id = non_empty(group_id);
        }
        if self.artifact_id.is_none() {
            self.artifact_id = non_empty(artifact_id);
        }
        if self.version.is_none() {
            self.version = non_empty(version);
        }
    }

    fn complete(&self) -> Option<ResolvedArtifact> {
        Some(ResolvedArtifact {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone()?,
            version: self.version.clone()?,
        })
    }
}

pub struct ArtifactResolver {
    identifiers: Arc<dyn IdentifierLookup>,
    directory: Arc<dyn DirectoryLookup>,
}

impl ArtifactResolver {
    pub fn new(identifiers: Arc<dyn IdentifierLookup>, directory: Arc<dyn DirectoryLookup>) -> Self {
        Self {
            identifiers,
            directory,
        }
    }

    /// Resolve coordinates for `plugin_key`, or `None` when no version can be found.
    ///
    /// Lookup failures are logged and treated as misses so later sources
    /// still get a chance.
    pub async fn resolve(
        &self,
        host_version: &str,
        plugin_key: &str,
        artifact_id: Option<&str>,
        version: Option<&str>,
        force_refresh: bool,
    ) -> Option<ResolvedArtifact> {
        let mut partial = Partial::default();
        partial.fill(None, artifact_id.map(str::to_string), version.map(str::to_string));
        if let Some(resolved) = partial.complete() {
            debug!("Using supplied coordinates for {}", plugin_key);
            return Some(resolved);
        }

        if !force_refresh {
            match self.identifiers.lookup(plugin_key) {
                Ok(Some(record)) => {
                    partial.fill(record.group_id, record.artifact_id, Some(record.version));
                    if let Some(resolved) = partial.complete() {
                        debug!("Resolved {} from identifier store", plugin_key);
                        return Some(resolved);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Identifier store lookup failed for {}: {}", plugin_key, e),
            }
        }

        match self
            .directory
            .lookup(host_version, plugin_key, force_refresh)
            .await
        {
            Ok(Some(entry)) => {
                debug!(
                    "Plugin directory lists {} {} for host {}",
                    plugin_key, entry.version, entry.compatible_prefix
                );
                partial.fill(None, entry.artifact_id, Some(entry.version));
            }
            Ok(None) => debug!(
                "Plugin directory has no {} entry for host version {}",
                plugin_key, host_version
            ),
            Err(e) => warn!("Plugin directory lookup failed for {}: {}", plugin_key, e),
        }

        if partial.version.is_some() && partial.artifact_id.is_none() {
            partial.artifact_id = Some(naming::plugin_name(plugin_key));
        }

        partial.complete()
    }
}
