// Plugin installer: resolution, verified download and versioned on-disk layout

pub mod command;
pub mod config;
pub mod constants;
pub mod coordinate;
pub mod error;
pub mod identifiers;
pub mod installer;
pub mod layout;
pub mod naming;
pub mod notify;
pub mod sources;

pub use command::{BroadcastEvent, InstallRequest, PluginCommand};
pub use config::KpmConfig;
pub use coordinate::{PluginCoordinate, PluginKind};
pub use error::{KpmError, Result};
pub use identifiers::{IdentifierRecord, IdentifierStore};
pub use installer::{CommandOutcome, InstalledArtifact, InstalledPlugin, PluginInstaller};
pub use layout::FileLayout;
pub use notify::{HostNotifier, PluginStateChange};
