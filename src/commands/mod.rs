// Subcommand handlers

pub mod event;
pub mod install;
pub mod list;
pub mod uninstall;

use crate::ui;
use kpm::coordinate::check_plugin_key;
use kpm::{CommandOutcome, KpmError, PluginCommand, PluginInstaller};

/// Run a command behind a spinner and report its outcome
pub(crate) async fn run(
    installer: &PluginInstaller,
    command: PluginCommand,
) -> anyhow::Result<CommandOutcome> {
    check_plugin_key(command.plugin_key())?;
    let pb = ui::spinner(&describe(&command));
    match installer.handle(command).await {
        Ok(outcome) => {
            ui::finish_spinner_success(&pb, &summarize(&outcome));
            Ok(outcome)
        }
        Err(e) => {
            ui::finish_spinner_error(&pb, &e.to_string());
            if let KpmError::InstallOperation { .. } | KpmError::UninstallOperation { .. } = &e {
                ui::dim(&format!("  caused by: {}", e.root_cause()));
            }
            Err(e.into())
        }
    }
}

fn describe(command: &PluginCommand) -> String {
    match command {
        PluginCommand::Install(_) => format!("Installing {}", command.plugin_key()),
        PluginCommand::Uninstall {
            plugin_key,
            version: Some(version),
        } => format!("Uninstalling {} {}", plugin_key, version),
        PluginCommand::Uninstall { plugin_key, .. } => {
            format!("Uninstalling every version of {}", plugin_key)
        }
    }
}

fn summarize(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Installed(installed) => format!(
            "Installed {} {} ({})",
            installed.plugin_key,
            installed.version,
            installed.archive.display()
        ),
        CommandOutcome::Uninstalled {
            plugin_key,
            version,
            active: Some(active),
        } => format!(
            "Uninstalled {} {}, active: {}",
            plugin_key,
            version,
            active.display()
        ),
        CommandOutcome::Uninstalled {
            plugin_key,
            version,
            active: None,
        } => format!("Uninstalled {} {}, no version left", plugin_key, version),
        CommandOutcome::Removed {
            plugin_key,
            existed: true,
        } => format!("Removed {}", plugin_key),
        CommandOutcome::Removed {
            plugin_key,
            existed: false,
        } => format!("{} was not installed", plugin_key),
    }
}
