mod cli;
mod commands;
mod ui;

use clap::Parser;
use cli::{Cli, Commands};
use kpm::{KpmConfig, PluginInstaller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = KpmConfig::load(cli.config.as_deref(), cli.bundles_root.as_deref())?;
    let installer = PluginInstaller::from_config(&config)?;

    match cli.command {
        Commands::Install(args) => commands::install::install(&installer, args).await?,
        Commands::Uninstall { key, version } => {
            commands::uninstall::uninstall(&installer, key, version).await?
        }
        Commands::List => commands::list::list(&installer)?,
        Commands::Event { file } => commands::event::event(&installer, &file).await?,
    }

    Ok(())
}
