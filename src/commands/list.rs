// List command for showing installed plugins

use crate::ui;
use kpm::PluginInstaller;

pub fn list(installer: &PluginInstaller) -> anyhow::Result<()> {
    let plugins = installer.list()?;
    if plugins.is_empty() {
        ui::dim(&format!(
            "No plugins installed under {}",
            installer.layout().kind_root().display()
        ));
        return Ok(());
    }

    for plugin in plugins {
        let active = plugin.active_version.as_deref().unwrap_or("none");
        ui::status(&plugin.plugin_key, &format!("active: {}", active));
        for version in &plugin.versions {
            let marker = if Some(version.as_str()) == plugin.active_version.as_deref() {
                "*"
            } else {
                " "
            };
            ui::dim(&format!("  {} {}", marker, version));
        }
        if let Some(record) = plugin.record
            && let (Some(group_id), Some(artifact_id)) = (record.group_id, record.artifact_id)
        {
            ui::dim(&format!("    {}:{}:{}", group_id, artifact_id, record.version));
        }
    }
    Ok(())
}
