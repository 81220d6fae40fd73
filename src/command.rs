// Broadcast plugin commands, decoded and validated once at the boundary

use crate::constants::{LATEST, PACKAGING};
use crate::coordinate::{PluginCoordinate, PluginKind, check_plugin_key, non_empty};
use crate::error::{KpmError, Result};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

/// Raw event as broadcast by the host
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    pub command_type: String,
    #[serde(default)]
    pub plugin_key: Option<String>,
    #[serde(default)]
    pub plugin_version: Option<String>,
    #[serde(default)]
    pub properties: Vec<EventProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventProperty {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallRequest {
    /// Download straight from a URI, bypassing resolution
    Uri {
        plugin_key: String,
        uri: String,
        version: Option<String>,
    },
    /// Resolve coordinates, then download from the repositories
    Coordinates {
        coordinate: PluginCoordinate,
        host_version: String,
        force_download: bool,
    },
}

impl InstallRequest {
    pub fn plugin_key(&self) -> &str {
        match self {
            InstallRequest::Uri { plugin_key, .. } => plugin_key,
            InstallRequest::Coordinates { coordinate, .. } => &coordinate.plugin_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginCommand {
    Install(InstallRequest),
    /// `version: None` removes every installed version
    Uninstall {
        plugin_key: String,
        version: Option<String>,
    },
}

impl PluginCommand {
    pub fn plugin_key(&self) -> &str {
        match self {
            PluginCommand::Install(request) => request.plugin_key(),
            PluginCommand::Uninstall { plugin_key, .. } => plugin_key,
        }
    }

    pub fn from_json(text: &str) -> Result<Option<Self>> {
        let event: BroadcastEvent = serde_json::from_str(text)
            .map_err(|e| KpmError::InvalidCommand(e.to_string()))?;
        Self::decode(&event)
    }

    /// Validate an event. Events without a plugin key are dropped with a
    /// warning and yield `Ok(None)`.
    pub fn decode(event: &BroadcastEvent) -> Result<Option<Self>> {
        let Some(plugin_key) = non_empty(event.plugin_key.clone()) else {
            warn!(
                "Ignoring {} command without a plugin key",
                event.command_type
            );
            return Ok(None);
        };
        check_plugin_key(&plugin_key)?;
        let version = non_empty(event.plugin_version.clone());
        let properties = Properties::new(&event.properties);

        let command = match event.command_type.as_str() {
            "INSTALL_PLUGIN" => PluginCommand::Install(decode_install(plugin_key, version, &properties)?),
            "UNINSTALL_PLUGIN" => PluginCommand::Uninstall {
                plugin_key,
                version,
            },
            other => {
                return Err(KpmError::InvalidCommand(format!(
                    "unknown command type '{}'",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

fn decode_install(
    plugin_key: String,
    version: Option<String>,
    properties: &Properties,
) -> Result<InstallRequest> {
    if let Some(uri) = properties.get("pluginUri") {
        return Ok(InstallRequest::Uri {
            plugin_key,
            uri,
            version,
        });
    }

    let kind = match properties.get("pluginType") {
        Some(kind) => PluginKind::parse(&kind)?,
        None => PluginKind::default(),
    };
    if let Some(packaging) = properties.get("pluginPackaging")
        && !packaging.eq_ignore_ascii_case(PACKAGING)
    {
        return Err(KpmError::InvalidCommand(format!(
            "unsupported packaging '{}'",
            packaging
        )));
    }
    let force_download = match properties.get("forceDownload") {
        None => false,
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => {
                return Err(KpmError::InvalidCommand(format!(
                    "forceDownload must be true or false, got '{}'",
                    value
                )));
            }
        },
    };

    let mut coordinate = PluginCoordinate::new(plugin_key)
        .with_group_id(properties.get("pluginGroupId"))
        .with_artifact_id(properties.get("pluginArtifactId"))
        .with_version(version)
        .with_classifier(properties.get("pluginClassifier"));
    coordinate.kind = kind;

    Ok(InstallRequest::Coordinates {
        coordinate,
        host_version: properties
            .get("kbVersion")
            .unwrap_or_else(|| LATEST.to_string()),
        force_download,
    })
}

/// Event properties with string-or-scalar values flattened to strings
struct Properties(HashMap<String, String>);

impl Properties {
    fn new(properties: &[EventProperty]) -> Self {
        let map = properties
            .iter()
            .filter_map(|p| {
                let value = match &p.value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                Some((p.key.clone(), value))
            })
            .collect();
        Self(map)
    }

    fn get(&self, key: &str) -> Option<String> {
        non_empty(self.0.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_with_uri() {
        let command = PluginCommand::from_json(
            r#"{
                "commandType": "INSTALL_PLUGIN",
                "pluginKey": "stripe",
                "pluginVersion": "1.0.0",
                "properties": [{"key": "pluginUri", "value": "https://host/stripe-1.0.0.jar"}]
            }"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            command,
            PluginCommand::Install(InstallRequest::Uri {
                plugin_key: "stripe".into(),
                uri: "https://host/stripe-1.0.0.jar".into(),
                version: Some("1.0.0".into()),
            })
        );
    }

    #[test]
    fn test_install_with_coordinates() {
        let command = PluginCommand::from_json(
            r#"{
                "commandType": "INSTALL_PLUGIN",
                "pluginKey": "stripe",
                "properties": [
                    {"key": "pluginArtifactId", "value": "stripe-plugin"},
                    {"key": "pluginGroupId", "value": "org.kill-bill.billing.plugin.java"},
                    {"key": "pluginType", "value": "java"},
                    {"key": "pluginPackaging", "value": "jar"},
                    {"key": "forceDownload", "value": true},
                    {"key": "kbVersion", "value": "0.24.0"}
                ]
            }"#,
        )
        .unwrap()
        .unwrap();

        let PluginCommand::Install(InstallRequest::Coordinates {
            coordinate,
            host_version,
            force_download,
        }) = command
        else {
            panic!("expected a coordinate install");
        };
        assert_eq!(coordinate.artifact_id.as_deref(), Some("stripe-plugin"));
        assert_eq!(
            coordinate.group_id.as_deref(),
            Some("org.kill-bill.billing.plugin.java")
        );
        assert_eq!(coordinate.version, None);
        assert_eq!(host_version, "0.24.0");
        assert!(force_download);
    }

    #[test]
    fn test_host_version_defaults_to_latest() {
        let command = PluginCommand::from_json(
            r#"{"commandType": "INSTALL_PLUGIN", "pluginKey": "stripe"}"#,
        )
        .unwrap()
        .unwrap();
        let PluginCommand::Install(InstallRequest::Coordinates {
            host_version,
            force_download,
            ..
        }) = command
        else {
            panic!("expected a coordinate install");
        };
        assert_eq!(host_version, "LATEST");
        assert!(!force_download);
    }

    #[test]
    fn test_missing_plugin_key_is_dropped() {
        assert_eq!(
            PluginCommand::from_json(r#"{"commandType": "INSTALL_PLUGIN"}"#).unwrap(),
            None
        );
        assert_eq!(
            PluginCommand::from_json(r#"{"commandType": "UNINSTALL_PLUGIN", "pluginKey": ""}"#)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_uninstall() {
        let command = PluginCommand::from_json(
            r#"{"commandType": "UNINSTALL_PLUGIN", "pluginKey": "stripe", "pluginVersion": "1.0.0"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            command,
            PluginCommand::Uninstall {
                plugin_key: "stripe".into(),
                version: Some("1.0.0".into())
            }
        );
        assert_eq!(command.plugin_key(), "stripe");
    }

    #[test]
    fn test_invalid_fields_fail_decode() {
        for properties in [
            r#"[{"key": "forceDownload", "value": "maybe"}]"#,
            r#"[{"key": "pluginType", "value": "ruby"}]"#,
            r#"[{"key": "pluginPackaging", "value": "war"}]"#,
        ] {
            let text = format!(
                r#"{{"commandType": "INSTALL_PLUGIN", "pluginKey": "stripe", "properties": {}}}"#,
                properties
            );
            assert!(
                PluginCommand::from_json(&text).is_err(),
                "expected failure for {}",
                properties
            );
        }
        assert!(matches!(
            PluginCommand::from_json(r#"{"commandType": "RESTART_PLUGIN", "pluginKey": "x"}"#),
            Err(KpmError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_path_like_plugin_key_fails_decode() {
        for command_type in ["INSTALL_PLUGIN", "UNINSTALL_PLUGIN"] {
            let text = format!(
                r#"{{"commandType": "{}", "pluginKey": "../../../x", "pluginVersion": "1.0.0"}}"#,
                command_type
            );
            assert!(matches!(
                PluginCommand::from_json(&text),
                Err(KpmError::InvalidCommand(_))
            ));
        }
    }
}
