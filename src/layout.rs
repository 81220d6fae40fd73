// On-disk plugin layout: versioned directories and the active-version link
//
// <bundles_root>/plugins/<kind>/<plugin_name>/<version>/<plugin_name>-<version>.jar
// <bundles_root>/plugins/<kind>/<plugin_name>/SET_DEFAULT -> <version>/

use crate::constants::{ACTIVE_LINK, PLUGINS_DIR};
use crate::coordinate::PluginKind;
use crate::error::{KpmError, Result};
use crate::naming;
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileLayout {
    bundles_root: PathBuf,
    kind: PluginKind,
}

impl FileLayout {
    pub fn new(bundles_root: impl Into<PathBuf>) -> Self {
        Self {
            bundles_root: bundles_root.into(),
            kind: PluginKind::Java,
        }
    }

    pub fn bundles_root(&self) -> &Path {
        &self.bundles_root
    }

    /// `<bundles_root>/plugins/<kind>`
    pub fn kind_root(&self) -> PathBuf {
        self.bundles_root.join(PLUGINS_DIR).join(self.kind.as_str())
    }

    pub fn plugin_root(&self, plugin_key: &str) -> PathBuf {
        self.kind_root().join(naming::plugin_name(plugin_key))
    }

    /// Path of a version directory. No I/O.
    pub fn resolve_directory(&self, plugin_key: &str, version: &str) -> PathBuf {
        self.plugin_root(plugin_key)
            .join(naming::canonical_version(version, None))
    }

    pub fn archive_path(&self, plugin_key: &str, version: &str) -> PathBuf {
        self.resolve_directory(plugin_key, version)
            .join(naming::archive_file_name(plugin_key, version))
    }

    /// Ensure the version directory exists and return it
    pub fn plugin_directory(&self, plugin_key: &str, version: &str) -> Result<PathBuf> {
        let dir = self.resolve_directory(plugin_key, version);
        self.ensure_within_plugins(&dir)?;
        fs::create_dir_all(&dir).map_err(|e| KpmError::fs(&dir, e))?;
        Ok(dir)
    }

    /// Point the sibling `SET_DEFAULT` link at `plugin_directory`, by version name.
    ///
    /// The old link is deleted before the new one is created; a crash in
    /// between leaves no active version until the next install or uninstall.
    pub fn set_active(&self, plugin_directory: &Path) -> Result<()> {
        let parent = plugin_directory.parent().ok_or_else(|| {
            KpmError::fs(
                plugin_directory,
                std::io::Error::new(ErrorKind::InvalidInput, "version directory has no parent"),
            )
        })?;
        fs::create_dir_all(parent).map_err(|e| KpmError::fs(parent, e))?;

        let version = plugin_directory.file_name().ok_or_else(|| {
            KpmError::fs(
                plugin_directory,
                std::io::Error::new(ErrorKind::InvalidInput, "version directory has no name"),
            )
        })?;

        let link = parent.join(ACTIVE_LINK);
        remove_link(&link)?;
        debug!(
            "Linking {} -> {}",
            link.display(),
            plugin_directory.display()
        );
        // Target is relative to the link's directory
        create_link(Path::new(version), &link).map_err(|e| KpmError::fs(&link, e))
    }

    /// Version name the active link points at, if any
    pub fn active_version(&self, plugin_key: &str) -> Result<Option<String>> {
        let link = self.plugin_root(plugin_key).join(ACTIVE_LINK);
        match fs::read_link(&link) {
            Ok(target) => Ok(target
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KpmError::fs(&link, e)),
        }
    }

    /// Installed version directory names, sorted
    pub fn installed_versions(&self, plugin_key: &str) -> Result<Vec<String>> {
        list_directories(&self.plugin_root(plugin_key))
    }

    /// Plugin directory names (`<key>-plugin`) under the kind root, sorted
    pub fn installed_plugins(&self) -> Result<Vec<String>> {
        list_directories(&self.kind_root())
    }

    /// Remove one version and re-point the active link.
    ///
    /// Returns the directory that became active, or `None` once no version is
    /// left (the plugin directory itself is then removed too). The next active
    /// version is the lexicographically greatest remaining directory name.
    pub fn remove_version(&self, plugin_key: &str, version: &str) -> Result<Option<PathBuf>> {
        let target = self.resolve_directory(plugin_key, version);
        debug!(
            "Removing {} ({})",
            target.display(),
            self.archive_path(plugin_key, version).display()
        );
        self.remove_tree(&target)?;

        let plugin_root = self.plugin_root(plugin_key);
        let remaining = list_directories(&plugin_root)?;
        remove_link(&plugin_root.join(ACTIVE_LINK))?;

        match remaining.into_iter().max() {
            Some(next) => {
                let next_dir = plugin_root.join(next);
                self.set_active(&next_dir)?;
                Ok(Some(next_dir))
            }
            None => {
                self.remove_tree(&plugin_root)?;
                Ok(None)
            }
        }
    }

    /// Remove every installed version of a plugin. Returns whether anything existed.
    pub fn remove_plugin(&self, plugin_key: &str) -> Result<bool> {
        let plugin_root = self.plugin_root(plugin_key);
        let existed = fs::symlink_metadata(&plugin_root).is_ok();
        self.remove_tree(&plugin_root)?;
        Ok(existed)
    }

    /// Recursive delete confined to the plugins directory; absent paths are fine
    /// Refuse paths that are not strictly below `<bundles_root>/plugins`
    fn ensure_within_plugins(&self, path: &Path) -> Result<()> {
        let plugins_root = self.bundles_root.join(PLUGINS_DIR);
        let escapes = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes || !path.starts_with(&plugins_root) || path == plugins_root {
            return Err(KpmError::fs(
                path,
                std::io::Error::new(
                    ErrorKind::PermissionDenied,
                    "path lies outside the plugins directory",
                ),
            ));
        }
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        self.ensure_within_plugins(path)?;
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} already absent", path.display());
                Ok(())
            }
            Err(e) => Err(KpmError::fs(path, e)),
        }
    }
}

fn list_directories(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(KpmError::fs(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| KpmError::fs(dir, e))?;
        // file_type() does not follow links, so SET_DEFAULT is skipped here
        let file_type = entry.file_type().map_err(|e| KpmError::fs(entry.path(), e))?;
        if file_type.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn remove_link(link: &Path) -> Result<()> {
    match fs::remove_file(link) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KpmError::fs(link, e)),
    }
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
