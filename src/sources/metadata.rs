// Remote metadata documents: Maven XML descriptors and the plugin directory

use crate::error::{KpmError, Result};
use crate::sources::cache::{CacheSettings, MetadataCache};
use crate::sources::directory::{self, DirectoryListing};
use crate::sources::http::HttpClient;
use crate::sources::repository::{self, AuthStrategy, RepositoryResolver};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::sync::Arc;

/// Fetches and parses small metadata documents, caching parsed results
pub struct MetadataClient {
    http: HttpClient,
    xml_values: MetadataCache<Option<String>>,
    directories: MetadataCache<Arc<DirectoryListing>>,
}

impl MetadataClient {
    pub fn new(http: HttpClient, cache: CacheSettings) -> Self {
        Self {
            http,
            xml_values: MetadataCache::new(cache),
            directories: MetadataCache::new(cache),
        }
    }

    /// Text of the first element at `path` (e.g. `project/parent/version`) in
    /// the XML document at `url`
    pub async fn fetch_xml_value(
        &self,
        url: &str,
        path: &str,
        auth: &AuthStrategy,
        force_refresh: bool,
    ) -> Result<Option<String>> {
        let key = format!("{}#{}", url, path);
        self.xml_values
            .get_or_fetch(&key, force_refresh, || async {
                debug!("Fetching {} from {}", path, url);
                let text = self.http.fetch_text(url, auth).await?;
                xml_value(&text, path).map_err(|e| KpmError::metadata(url, e))
            })
            .await
    }

    /// Latest released version of `group_id:artifact_id`, from its `maven-metadata.xml`
    pub async fn latest_release(
        &self,
        repository: &RepositoryResolver,
        group_id: &str,
        artifact_id: &str,
        force_refresh: bool,
    ) -> Result<Option<String>> {
        let url = repository.artifact_url(&format!(
            "{}/maven-metadata.xml",
            repository::artifact_root(group_id, artifact_id)
        ));
        let auth = repository.auth();

        if let Some(release) = self
            .fetch_xml_value(&url, "metadata/versioning/release", auth, force_refresh)
            .await?
        {
            return Ok(Some(release));
        }
        self.fetch_xml_value(&url, "metadata/versioning/latest", auth, force_refresh)
            .await
    }

    /// Parsed plugin directory listing at `url`
    pub async fn fetch_plugin_directory(
        &self,
        url: &str,
        force_refresh: bool,
    ) -> Result<Arc<DirectoryListing>> {
        self.directories
            .get_or_fetch(url, force_refresh, || async {
                debug!("Fetching plugin directory {}", url);
                let text = self.http.fetch_text(url, &AuthStrategy::None).await?;
                directory::parse_listing(url, &text).map(Arc::new)
            })
            .await
    }
}

/// Trimmed text of the first element whose ancestry matches `path`
pub fn xml_value(document: &str, path: &str) -> std::result::Result<Option<String>, quick_xml::Error> {
    let wanted: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                stack.push(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) if stack == wanted => {
                let value = text.unescape()?.trim().to_string();
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
            Event::CData(data) if stack == wanted => {
                let value = String::from_utf8_lossy(&data).trim().to_string();
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAVEN_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.kill-bill.billing</groupId>
  <artifactId>killbill</artifactId>
  <versioning>
    <latest>0.24.11</latest>
    <release>0.24.10</release>
    <versions>
      <version>0.24.10</version>
      <version>0.24.11</version>
    </versions>
  </versioning>
</metadata>"#;

    #[test]
    fn test_xml_value_reads_cdata() {
        let document = "<metadata><versioning><release><![CDATA[ 0.24.10 ]]></release></versioning></metadata>";
        assert_eq!(
            xml_value(document, "metadata/versioning/release").unwrap(),
            Some("0.24.10".to_string())
        );
    }

    #[test]
    fn test_xml_value_path_lookup() {
        assert_eq!(
            xml_value(MAVEN_METADATA, "metadata/versioning/release").unwrap(),
            Some("0.24.10".to_string())
        );
        assert_eq!(
            xml_value(MAVEN_METADATA, "metadata/versioning/versions/version").unwrap(),
            Some("0.24.10".to_string())
        );
        assert_eq!(
            xml_value(MAVEN_METADATA, "metadata/versioning/missing").unwrap(),
            None
        );
        // Ancestry must match, not just the element name
        assert_eq!(xml_value(MAVEN_METADATA, "versioning/release").unwrap(), None);
    }

    #[test]
    fn test_xml_value_namespaced_pom() {
        let pom = r#"<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent><groupId>org.kill-bill.billing</groupId><version>0.146.2</version></parent>
  <version>0.24.0</version>
</project>"#;
        assert_eq!(
            xml_value(pom, "project/parent/version").unwrap(),
            Some("0.146.2".to_string())
        );
        assert_eq!(
            xml_value(pom, "project/version").unwrap(),
            Some("0.24.0".to_string())
        );
    }
}
