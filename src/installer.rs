// Install/uninstall orchestration over resolution, download and the file layout

use crate::command::{InstallRequest, PluginCommand};
use crate::config::KpmConfig;
use crate::constants::{LATEST, PLUGIN_SUFFIX};
use crate::coordinate::PluginCoordinate;
use crate::error::{KpmError, Result};
use crate::identifiers::{IdentifierRecord, IdentifierStore};
use crate::layout::FileLayout;
use crate::naming::{self, PluginNaming};
use crate::notify::{HostNotifier, HttpNotifier, LogNotifier, PluginStateChange};
use crate::sources::http;
use crate::sources::{
    ArtifactDownloader, ArtifactResolver, AuthStrategy, DownloadRequest, HttpClient,
    IntegrityVerifier, MetadataClient, PluginDirectory, RepositoryResolver,
};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

static ANONYMOUS: AuthStrategy = AuthStrategy::None;

/// A plugin version placed on disk and made active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub plugin_key: String,
    pub version: String,
    pub directory: PathBuf,
    pub archive: PathBuf,
}

/// One plugin directory as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub plugin_key: String,
    pub plugin_name: String,
    pub versions: Vec<String>,
    pub active_version: Option<String>,
    pub record: Option<IdentifierRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Installed(InstalledArtifact),
    /// One version removed; `active` is the directory now linked, if any
    Uninstalled {
        plugin_key: String,
        version: String,
        active: Option<PathBuf>,
    },
    /// Every version removed
    Removed { plugin_key: String, existed: bool },
}

/// Entry point for installing and uninstalling plugins.
///
/// Operations on different plugin keys may run concurrently. Operations on
/// the same key must be serialised by the caller: the active link swap and the
/// identifier store rewrite are not atomic across calls.
pub struct PluginInstaller {
    layout: FileLayout,
    identifiers: Arc<IdentifierStore>,
    metadata: Arc<MetadataClient>,
    resolver: ArtifactResolver,
    downloader: ArtifactDownloader,
    http: HttpClient,
    primary: RepositoryResolver,
    notifier: Arc<dyn HostNotifier>,
    host_group_id: String,
    host_artifact_id: String,
    default_group_id: String,
}

impl PluginInstaller {
    pub fn from_config(config: &KpmConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(&config.http_settings())?;
        let identifiers = Arc::new(IdentifierStore::open(&config.bundles_root));
        let metadata = Arc::new(MetadataClient::new(http.clone(), config.cache_settings()));
        let directory = Arc::new(PluginDirectory::new(
            metadata.clone(),
            &config.plugin_directory_url,
        ));
        let resolver = ArtifactResolver::new(identifiers.clone(), directory);

        let primary = config.primary_repository()?;
        let verifier = IntegrityVerifier::new(http.clone(), config.verify_sha1);
        let downloader = ArtifactDownloader::new(
            http.clone(),
            primary.clone(),
            config.fallback_repository()?,
            verifier,
        );

        let notifier: Arc<dyn HostNotifier> = match &config.notify_url {
            Some(url) => Arc::new(HttpNotifier::new(http.clone(), url)),
            None => Arc::new(LogNotifier),
        };

        Ok(Self {
            layout: FileLayout::new(&config.bundles_root),
            identifiers,
            metadata,
            resolver,
            downloader,
            http,
            primary,
            notifier,
            host_group_id: config.host_group_id.clone(),
            host_artifact_id: config.host_artifact_id.clone(),
            default_group_id: config.default_group_id.clone(),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn HostNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    pub fn identifiers(&self) -> &IdentifierStore {
        &self.identifiers
    }

    /// Run a decoded command.
    ///
    /// A single-version uninstall that leaves no version behind also forgets
    /// the plugin's identifier.
    pub async fn handle(&self, command: PluginCommand) -> Result<CommandOutcome> {
        match command {
            PluginCommand::Install(InstallRequest::Uri {
                plugin_key,
                uri,
                version,
            }) => self
                .install_from_uri(&plugin_key, &uri, version.as_deref())
                .await
                .map(CommandOutcome::Installed),
            PluginCommand::Install(InstallRequest::Coordinates {
                coordinate,
                host_version,
                force_download,
            }) => self
                .install(&coordinate, &host_version, force_download)
                .await
                .map(CommandOutcome::Installed),
            PluginCommand::Uninstall {
                plugin_key,
                version: Some(version),
            } => {
                let active = self.uninstall(&plugin_key, &version).await?;
                if active.is_none() {
                    self.identifiers
                        .remove(&plugin_key)
                        .map_err(|e| KpmError::uninstall(&plugin_key, Some(&version), e))?;
                }
                Ok(CommandOutcome::Uninstalled {
                    plugin_key,
                    version: naming::canonical_version(&version, None),
                    active,
                })
            }
            PluginCommand::Uninstall {
                plugin_key,
                version: None,
            } => {
                let existed = self.uninstall_all(&plugin_key).await?;
                Ok(CommandOutcome::Removed {
                    plugin_key,
                    existed,
                })
            }
        }
    }

    /// Install an artifact downloaded directly from `uri`.
    ///
    /// The version comes from `version`, or failing that from the file name in the URI.
    pub async fn install_from_uri(
        &self,
        plugin_key: &str,
        uri: &str,
        version: Option<&str>,
    ) -> Result<InstalledArtifact> {
        self.try_install_from_uri(plugin_key, uri, version)
            .await
            .map_err(|e| KpmError::install(plugin_key, version, e))
    }

    async fn try_install_from_uri(
        &self,
        plugin_key: &str,
        uri: &str,
        version: Option<&str>,
    ) -> Result<InstalledArtifact> {
        let file_name = http::file_name_from_url(uri);
        let naming = PluginNaming::new(plugin_key, version.unwrap_or_default(), Some(&file_name));
        debug!("Installing {} as {} {}", uri, naming.plugin_name, naming.version);

        let staging = TempDir::new()?;
        let downloaded = staging.path().join(&file_name);
        info!("Downloading {} from {}", plugin_key, uri);
        self.http
            .download_to(uri, self.auth_for(uri), &downloaded)
            .await?;

        let installed = self.place_archive(plugin_key, &naming.version, &downloaded)?;
        self.notify(PluginStateChange::NewVersion, plugin_key, Some(&installed.version))
            .await;
        self.identifiers.add(
            plugin_key,
            IdentifierRecord::new(plugin_key, None, None, &installed.version),
        )?;
        Ok(installed)
    }

    /// Resolve coordinates, download with verification, and install.
    ///
    /// Unless `force_download` is set, a version already present on disk is
    /// re-activated instead of downloaded again.
    pub async fn install(
        &self,
        coordinate: &PluginCoordinate,
        host_version: &str,
        force_download: bool,
    ) -> Result<InstalledArtifact> {
        self.try_install(coordinate, host_version, force_download)
            .await
            .map_err(|e| {
                KpmError::install(&coordinate.plugin_key, coordinate.version.as_deref(), e)
            })
    }

    async fn try_install(
        &self,
        coordinate: &PluginCoordinate,
        host_version: &str,
        force_download: bool,
    ) -> Result<InstalledArtifact> {
        let plugin_key = coordinate.plugin_key.as_str();
        let host_version = self.resolve_host_version(host_version, force_download).await;

        let resolved = self
            .resolver
            .resolve(
                &host_version,
                plugin_key,
                coordinate.artifact_id.as_deref(),
                coordinate.version.as_deref(),
                force_download,
            )
            .await
            .ok_or_else(|| KpmError::Resolution {
                plugin_key: plugin_key.to_string(),
                host_version: host_version.clone(),
            })?;

        let group_id = coordinate
            .group_id
            .clone()
            .or(resolved.group_id)
            .unwrap_or_else(|| self.default_group_id.clone());

        let existing = self.layout.archive_path(plugin_key, &resolved.version);
        let installed = if !force_download && existing.is_file() {
            info!(
                "{} {} already installed, activating it",
                plugin_key, resolved.version
            );
            let directory = self.layout.plugin_directory(plugin_key, &resolved.version)?;
            self.layout.set_active(&directory)?;
            InstalledArtifact {
                plugin_key: plugin_key.to_string(),
                version: naming::canonical_version(&resolved.version, None),
                directory,
                archive: existing,
            }
        } else {
            let download = self
                .downloader
                .download(&DownloadRequest {
                    plugin_key: plugin_key.to_string(),
                    host_version: host_version.clone(),
                    group_id: group_id.clone(),
                    artifact_id: resolved.artifact_id.clone(),
                    version: resolved.version.clone(),
                    classifier: coordinate.classifier.clone(),
                })
                .await?;
            self.place_archive(plugin_key, &download.version, &download.path)?
        };

        self.notify(PluginStateChange::NewVersion, plugin_key, Some(&installed.version))
            .await;
        self.identifiers.add(
            plugin_key,
            IdentifierRecord::new(
                plugin_key,
                Some(group_id),
                Some(resolved.artifact_id),
                &installed.version,
            ),
        )?;
        Ok(installed)
    }

    /// Remove one version and activate the next one.
    ///
    /// Returns the newly active directory, or `None` when no version is left.
    /// The identifier store is left untouched; see [`PluginInstaller::handle`].
    pub async fn uninstall(&self, plugin_key: &str, version: &str) -> Result<Option<PathBuf>> {
        let version = naming::canonical_version(version, None);
        let active = self
            .layout
            .remove_version(plugin_key, &version)
            .map_err(|e| KpmError::uninstall(plugin_key, Some(&version), e))?;

        match &active {
            Some(dir) => info!(
                "Uninstalled {} {}, now active: {}",
                plugin_key,
                version,
                dir.display()
            ),
            None => info!("Uninstalled {} {}, no version left", plugin_key, version),
        }
        self.notify(PluginStateChange::Removed, plugin_key, Some(&version))
            .await;
        Ok(active)
    }

    /// Remove every version and forget the identifier.
    /// Returns whether anything was installed.
    pub async fn uninstall_all(&self, plugin_key: &str) -> Result<bool> {
        let existed = self
            .layout
            .remove_plugin(plugin_key)
            .and_then(|existed| {
                self.identifiers.remove(plugin_key)?;
                Ok(existed)
            })
            .map_err(|e| KpmError::uninstall(plugin_key, None, e))?;

        self.notify(PluginStateChange::Removed, plugin_key, None)
            .await;
        Ok(existed)
    }

    /// Installed plugins, from the directory tree merged with stored identifiers
    pub fn list(&self) -> Result<Vec<InstalledPlugin>> {
        let mut records = self.identifiers.list()?;
        let mut plugins = Vec::new();

        for plugin_name in self.layout.installed_plugins()? {
            let Some(plugin_key) = plugin_name.strip_suffix(PLUGIN_SUFFIX) else {
                debug!("Skipping foreign directory {}", plugin_name);
                continue;
            };
            plugins.push(InstalledPlugin {
                plugin_key: plugin_key.to_string(),
                versions: self.layout.installed_versions(plugin_key)?,
                active_version: self.layout.active_version(plugin_key)?,
                record: records.remove(plugin_key),
                plugin_name,
            });
        }
        Ok(plugins)
    }

    /// Copy the archive into its version directory and point the active link at it
    fn place_archive(&self, plugin_key: &str, version: &str, source: &Path) -> Result<InstalledArtifact> {
        let directory = self.layout.plugin_directory(plugin_key, version)?;
        let archive = directory.join(naming::archive_file_name(plugin_key, version));
        fs::copy(source, &archive).map_err(|e| KpmError::fs(&archive, e))?;
        self.layout.set_active(&directory)?;
        info!("Installed {} at {}", plugin_key, archive.display());

        Ok(InstalledArtifact {
            plugin_key: plugin_key.to_string(),
            version: naming::canonical_version(version, None),
            directory,
            archive,
        })
    }

    async fn resolve_host_version(&self, host_version: &str, force_refresh: bool) -> String {
        if !host_version.eq_ignore_ascii_case(LATEST) {
            return host_version.to_string();
        }
        match self
            .metadata
            .latest_release(
                &self.primary,
                &self.host_group_id,
                &self.host_artifact_id,
                force_refresh,
            )
            .await
        {
            Ok(Some(latest)) => {
                debug!("Host version {} resolved to {}", LATEST, latest);
                latest
            }
            Ok(None) => {
                warn!("No release listed for {}:{}", self.host_group_id, self.host_artifact_id);
                host_version.to_string()
            }
            Err(e) => {
                warn!("Unable to resolve the latest host version: {}", e);
                host_version.to_string()
            }
        }
    }

    /// Repository credentials apply only to URIs under the primary repository
    fn auth_for(&self, uri: &str) -> &AuthStrategy {
        if self.primary.contains(uri) {
            self.primary.auth()
        } else {
            &ANONYMOUS
        }
    }

    async fn notify(&self, state: PluginStateChange, plugin_key: &str, version: Option<&str>) {
        if let Err(e) = self
            .notifier
            .notify_plugin_state_changed(state, plugin_key, version)
            .await
        {
            warn!(
                "Unable to notify host of {} for {}: {}",
                state, plugin_key, e
            );
        }
    }
}
