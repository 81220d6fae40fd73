// Host notification when a plugin version appears or disappears

use crate::error::Result;
use crate::sources::HttpClient;
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginStateChange {
    NewVersion,
    Removed,
}

impl fmt::Display for PluginStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginStateChange::NewVersion => "NEW_VERSION",
            PluginStateChange::Removed => "REMOVED",
        })
    }
}

/// Receives plugin state changes. Callers treat failures as non-fatal.
#[async_trait]
pub trait HostNotifier: Send + Sync {
    async fn notify_plugin_state_changed(
        &self,
        state: PluginStateChange,
        plugin_key: &str,
        version: Option<&str>,
    ) -> Result<()>;
}

/// Default notifier: records the change in the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl HostNotifier for LogNotifier {
    async fn notify_plugin_state_changed(
        &self,
        state: PluginStateChange,
        plugin_key: &str,
        version: Option<&str>,
    ) -> Result<()> {
        info!(
            "Plugin {} {} ({})",
            plugin_key,
            version.unwrap_or("all versions"),
            state
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateChangeBody<'a> {
    state: PluginStateChange,
    plugin_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugin_version: Option<&'a str>,
}

/// POSTs each change as JSON to the host
pub struct HttpNotifier {
    http: HttpClient,
    url: String,
}

impl HttpNotifier {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl HostNotifier for HttpNotifier {
    async fn notify_plugin_state_changed(
        &self,
        state: PluginStateChange,
        plugin_key: &str,
        version: Option<&str>,
    ) -> Result<()> {
        let body = StateChangeBody {
            state,
            plugin_key,
            plugin_version: version,
        };
        self.http.post_json(&self.url, &body).await
    }
}
