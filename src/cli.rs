// CLI module for handling command-line interface

use clap::{Args, Parser, Subcommand};
use kpm::constants::LATEST;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kpm")]
#[command(about = "Plugin installer for Kill Bill bundles directories")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to <bundles-root>/kpm.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bundles root, overriding KPM_BUNDLES_ROOT and the configuration file
    #[arg(long, global = true)]
    pub bundles_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install a plugin from coordinates or a direct URI
    Install(InstallArgs),
    /// Remove one version, or every version when none is given
    Uninstall {
        key: String,
        version: Option<String>,
    },
    /// List installed plugins and their active version
    List,
    /// Apply a broadcast command read from a JSON file ("-" for stdin)
    Event { file: PathBuf },
}

#[derive(Args)]
pub struct InstallArgs {
    pub key: String,

    /// Download directly from this URI instead of resolving coordinates
    #[arg(long, conflicts_with_all = ["group_id", "artifact_id", "classifier", "force_download"])]
    pub uri: Option<String>,

    #[arg(long)]
    pub group_id: Option<String>,

    #[arg(long)]
    pub artifact_id: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub classifier: Option<String>,

    /// Host version used to pick a compatible plugin version
    #[arg(long, default_value = LATEST)]
    pub host_version: String,

    /// Skip the identifier store and re-download even if already installed
    #[arg(long)]
    pub force_download: bool,
}
