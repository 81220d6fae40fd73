// Install command for placing a plugin version and activating it

use crate::cli::InstallArgs;
use kpm::{InstallRequest, PluginCommand, PluginCoordinate, PluginInstaller};

pub async fn install(installer: &PluginInstaller, args: InstallArgs) -> anyhow::Result<()> {
    let request = match args.uri {
        Some(uri) => InstallRequest::Uri {
            plugin_key: args.key,
            uri,
            version: args.version,
        },
        None => InstallRequest::Coordinates {
            coordinate: PluginCoordinate::new(args.key)
                .with_group_id(args.group_id)
                .with_artifact_id(args.artifact_id)
                .with_version(args.version)
                .with_classifier(args.classifier),
            host_version: args.host_version,
            force_download: args.force_download,
        },
    };

    super::run(installer, PluginCommand::Install(request)).await?;
    Ok(())
}
