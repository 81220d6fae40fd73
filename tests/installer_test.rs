use kpm::config::RepositoryConfig;
use kpm::sources::hash::sha1_hex;
use kpm::sources::{AuthStrategy, CacheSettings, HttpClient, MetadataClient, RepositoryResolver};
use kpm::{KpmConfig, KpmError, PluginCommand, PluginCoordinate, PluginInstaller};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::{SimpleFileOptions, ZipWriter};

const PLUGIN_PATH: &str = "/repo/org/kill-bill/billing/plugin/java/p-plugin";

fn jar_bytes(marker: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(format!("Manifest-Version: 1.0\nX-Marker: {}\n", marker).as_bytes())
        .unwrap();
    zip.finish().unwrap().into_inner()
}

fn config(root: &Path, server: &MockServer) -> KpmConfig {
    KpmConfig {
        bundles_root: root.to_path_buf(),
        repository: RepositoryConfig {
            url: format!("{}/repo", server.uri()),
            auth: AuthStrategy::None,
        },
        public_fallback: false,
        plugin_directory_url: format!("{}/plugins_directory.yml", server.uri()),
        ..Default::default()
    }
}

fn version_dir(root: &Path, key: &str, version: &str) -> PathBuf {
    root.join("plugins/java")
        .join(format!("{}-plugin", key))
        .join(version)
}

fn active_link(root: &Path, key: &str) -> PathBuf {
    root.join("plugins/java")
        .join(format!("{}-plugin", key))
        .join("SET_DEFAULT")
}

/// Serve a jar and its `.sha1` under `<base>/<version>/`
async fn mount_artifact(server: &MockServer, base: &str, artifact: &str, version: &str, sha1: Option<&str>) {
    let jar = jar_bytes(version);
    let digest = sha1.map(str::to_string).unwrap_or_else(|| sha1_hex(&jar));
    let jar_path = format!("{}/{}/{}-{}.jar", base, version, artifact, version);

    Mock::given(method("GET"))
        .and(path(jar_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jar))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}.sha1", jar_path)))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}  {}-{}.jar\n", digest, artifact, version)))
        .mount(server)
        .await;
}

async fn mount_directory(server: &MockServer, listing: &str) {
    Mock::given(method("GET"))
        .and(path("/plugins_directory.yml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_uri_install_uninstall_round_trip() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/files/p-1.0.0.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jar_bytes("1.0.0")))
        .mount(&server)
        .await;

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let installed = installer
        .install_from_uri("p", &format!("{}/files/p-1.0.0.jar", server.uri()), Some("1.0.0"))
        .await
        .unwrap();

    let dir = version_dir(root.path(), "p", "1.0.0");
    assert_eq!(installed.archive, dir.join("p-plugin-1.0.0.jar"));
    assert!(installed.archive.is_file());
    assert_eq!(fs::read_link(active_link(root.path(), "p")).unwrap(), PathBuf::from("1.0.0"));
    let record = installer.identifiers().get("p").unwrap().unwrap();
    assert_eq!(record.version, "1.0.0");
    assert_eq!(record.group_id, None);

    assert_eq!(installer.uninstall("p", "1.0.0").await.unwrap(), None);
    assert!(!dir.exists());
    assert!(fs::symlink_metadata(active_link(root.path(), "p")).is_err());
}

#[tokio::test]
async fn test_uri_install_derives_version_from_uri() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/files/p-plugin-2.1.0-SNAPSHOT.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jar_bytes("2.1.0")))
        .mount(&server)
        .await;

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let installed = installer
        .install_from_uri(
            "p",
            &format!("{}/files/p-plugin-2.1.0-SNAPSHOT.jar", server.uri()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(installed.version, "2.1.0");
    assert!(version_dir(root.path(), "p", "2.1.0").join("p-plugin-2.1.0.jar").is_file());
}

#[tokio::test]
async fn test_multi_version_uninstall_tie_break() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();

    for version in ["1.0.0", "1.0.1", "1.0.2"] {
        Mock::given(method("GET"))
            .and(path(format!("/files/p-{}.jar", version)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jar_bytes(version)))
            .mount(&server)
            .await;
        installer
            .install_from_uri(
                "p",
                &format!("{}/files/p-{}.jar", server.uri(), version),
                Some(version),
            )
            .await
            .unwrap();
    }
    let link = active_link(root.path(), "p");
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("1.0.2"));

    let active = installer.uninstall("p", "1.0.2").await.unwrap();
    assert_eq!(active, Some(version_dir(root.path(), "p", "1.0.1")));
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("1.0.1"));

    installer.uninstall("p", "1.0.1").await.unwrap();
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("1.0.0"));
}

#[tokio::test]
async fn test_coordinate_install_resolved_from_directory() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_directory(&server, ":p:\n  :type: :java\n  :versions:\n    :0.22: 1.0.0\n    :0.24: 1.2.0\n").await;
    mount_artifact(&server, PLUGIN_PATH, "p-plugin", "1.2.0", None).await;

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let installed = installer
        .install(&PluginCoordinate::new("p"), "0.24.1", false)
        .await
        .unwrap();

    assert_eq!(installed.version, "1.2.0");
    assert!(version_dir(root.path(), "p", "1.2.0").join("p-plugin-1.2.0.jar").is_file());
    let record = installer.identifiers().get("p").unwrap().unwrap();
    assert_eq!(record.artifact_id.as_deref(), Some("p-plugin"));
    assert_eq!(
        record.group_id.as_deref(),
        Some("org.kill-bill.billing.plugin.java")
    );
    assert_eq!(record.version, "1.2.0");
}

#[tokio::test]
async fn test_latest_host_version_from_maven_metadata() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/repo/org/kill-bill/billing/killbill/maven-metadata.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<metadata><groupId>org.kill-bill.billing</groupId><versioning>\
             <latest>0.24.3-SNAPSHOT</latest><release>0.24.2</release>\
             </versioning></metadata>",
        ))
        .mount(&server)
        .await;
    mount_directory(&server, ":p:\n  :versions:\n    :0.22: 1.0.0\n    :0.24: 1.2.0\n").await;
    mount_artifact(&server, PLUGIN_PATH, "p-plugin", "1.2.0", None).await;

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let installed = installer
        .install(&PluginCoordinate::new("p"), "LATEST", false)
        .await
        .unwrap();
    assert_eq!(installed.version, "1.2.0");
}

#[tokio::test]
async fn test_latest_release_falls_back_to_latest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repo/org/kill-bill/billing/killbill/maven-metadata.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<metadata><versioning><latest>0.25.0</latest></versioning></metadata>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpClient::new(&KpmConfig::default().http_settings()).unwrap();
    let metadata = MetadataClient::new(
        http,
        CacheSettings {
            bypass: false,
            max_entries: 8,
            ttl: Duration::from_secs(60),
        },
    );
    let repository =
        RepositoryResolver::new(&format!("{}/repo", server.uri()), AuthStrategy::None).unwrap();

    for _ in 0..2 {
        let latest = metadata
            .latest_release(&repository, "org.kill-bill.billing", "killbill", false)
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("0.25.0"));
    }
}

#[tokio::test]
async fn test_download_falls_back_to_public_repository() {
    let primary = MockServer::start().await;
    let public = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_artifact(&public, "/maven2/org/kill-bill/billing/plugin/java/p-plugin", "p-plugin", "3.0.0", None).await;

    let config = KpmConfig {
        public_fallback: true,
        public_repository_url: format!("{}/maven2", public.uri()),
        ..config(root.path(), &primary)
    };
    let installer = PluginInstaller::from_config(&config).unwrap();
    let coordinate = PluginCoordinate::new("p")
        .with_artifact_id(Some("p-plugin".into()))
        .with_version(Some("3.0.0".into()));

    let installed = installer.install(&coordinate, "0.24.0", false).await.unwrap();
    assert_eq!(installed.version, "3.0.0");
    assert!(installed.archive.is_file());
}

#[tokio::test]
async fn test_checksum_mismatch_is_rejected() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_artifact(
        &server,
        PLUGIN_PATH,
        "p-plugin",
        "1.0.0",
        Some("0000000000000000000000000000000000000000"),
    )
    .await;
    let coordinate = PluginCoordinate::new("p")
        .with_artifact_id(Some("p-plugin".into()))
        .with_version(Some("1.0.0".into()));

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let err = installer.install(&coordinate, "0.24.0", false).await.unwrap_err();
    assert!(matches!(err, KpmError::InstallOperation { .. }));
    assert!(matches!(err.root_cause(), KpmError::Integrity { .. }));
    assert!(!version_dir(root.path(), "p", "1.0.0").exists());
    assert_eq!(installer.identifiers().get("p").unwrap(), None);

    // Same artifact is accepted once verification is turned off
    let lenient = KpmConfig {
        verify_sha1: false,
        ..config(root.path(), &server)
    };
    let installer = PluginInstaller::from_config(&lenient).unwrap();
    installer.install(&coordinate, "0.24.0", false).await.unwrap();
    assert!(version_dir(root.path(), "p", "1.0.0").join("p-plugin-1.0.0.jar").is_file());
}

#[tokio::test]
async fn test_missing_artifact_is_not_found() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let coordinate = PluginCoordinate::new("p")
        .with_artifact_id(Some("p-plugin".into()))
        .with_version(Some("4.0.0".into()));

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let err = installer.install(&coordinate, "0.24.0", false).await.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        KpmError::ArtifactNotFound { version, .. } if version == "4.0.0"
    ));
}

#[tokio::test]
async fn test_unresolvable_plugin_reports_resolution_error() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_directory(&server, ":other:\n  :versions:\n    :0.24: 1.0.0\n").await;

    let installer = PluginInstaller::from_config(&config(root.path(), &server)).unwrap();
    let err = installer
        .install(&PluginCoordinate::new("ghost"), "0.24.0", false)
        .await
        .unwrap_err();

    match err {
        KpmError::InstallOperation {
            plugin_key, source, ..
        } => {
            assert_eq!(plugin_key, "ghost");
            assert!(matches!(*source, KpmError::Resolution { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_broadcast_install_notifies_host() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_artifact(&server, PLUGIN_PATH, "p-plugin", "1.1.0", None).await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({
            "state": "NEW_VERSION",
            "pluginKey": "p",
            "pluginVersion": "1.1.0"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = KpmConfig {
        notify_url: Some(format!("{}/notify", server.uri())),
        ..config(root.path(), &server)
    };
    let installer = PluginInstaller::from_config(&config).unwrap();
    let command = PluginCommand::from_json(
        r#"{
            "commandType": "INSTALL_PLUGIN",
            "pluginKey": "p",
            "pluginVersion": "1.1.0",
            "properties": [
                {"key": "pluginArtifactId", "value": "p-plugin"},
                {"key": "kbVersion", "value": "0.24.0"}
            ]
        }"#,
    )
    .unwrap()
    .unwrap();

    installer.handle(command).await.unwrap();
    assert!(version_dir(root.path(), "p", "1.1.0").join("p-plugin-1.1.0.jar").is_file());
}
