// Uninstall command for removing one or all versions of a plugin

use kpm::{PluginCommand, PluginInstaller};

pub async fn uninstall(
    installer: &PluginInstaller,
    key: String,
    version: Option<String>,
) -> anyhow::Result<()> {
    super::run(
        installer,
        PluginCommand::Uninstall {
            plugin_key: key,
            version,
        },
    )
    .await?;
    Ok(())
}
