// Shared HTTP client utilities

use crate::error::{KpmError, Result};
use crate::sources::repository::AuthStrategy;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// User-Agent string for all HTTP requests
const USER_AGENT: &str = concat!("kpm/", env!("CARGO_PKG_VERSION"));

/// Connection settings applied to every request
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// When false, certificate validation is skipped
    pub strict_ssl: bool,
}

/// Cheap to clone; clones share one connection pool
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(!settings.strict_ssl)
            .build()
            .map_err(|e| KpmError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, auth: &AuthStrategy) -> Result<Response> {
        let response = auth.apply(self.client.get(url)).send().await?;
        Ok(response)
    }

    /// Fetch a text document, failing on any non-success status
    pub async fn fetch_text(&self, url: &str, auth: &AuthStrategy) -> Result<String> {
        let response = self.get(url, auth).await?;
        let response = ensure_success(response, url)?;
        Ok(response.text().await?)
    }

    /// Fetch a text document, returning None for 404 errors
    pub async fn fetch_text_optional(
        &self,
        url: &str,
        auth: &AuthStrategy,
    ) -> Result<Option<String>> {
        let response = self.get(url, auth).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, url)?;
        Ok(Some(response.text().await?))
    }

    /// Download `url` into `dest`
    pub async fn download_to(&self, url: &str, auth: &AuthStrategy, dest: &Path) -> Result<()> {
        let response = self.get(url, auth).await?;
        let response = ensure_success(response, url)?;
        let bytes = response.bytes().await?;
        fs::write(dest, &bytes).map_err(|e| KpmError::fs(dest, e))
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let response = self.client.post(url).json(body).send().await?;
        ensure_success(response, url)?;
        Ok(())
    }
}

fn ensure_success(response: Response, url: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(KpmError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

/// Extract the last path segment of a URL, without its query string
pub fn file_name_from_url(url: &str) -> String {
    url.split('?')
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download.jar")
        .to_string()
}
