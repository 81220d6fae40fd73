// Event command for applying a broadcast plugin command

use crate::ui;
use kpm::{PluginCommand, PluginInstaller};
use log::debug;
use std::io::Read;
use std::path::Path;

pub async fn event(installer: &PluginInstaller, file: &Path) -> anyhow::Result<()> {
    let text = if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?
    };

    let Some(command) = PluginCommand::from_json(&text)? else {
        ui::warning("Event has no plugin key, nothing to do");
        return Ok(());
    };
    debug!("Decoded event: {:?}", command);

    super::run(installer, command).await?;
    Ok(())
}
