// Artifact download from the primary repository with public fallback

use crate::constants::PACKAGING;
use crate::error::{KpmError, Result};
use crate::sources::http::HttpClient;
use crate::sources::integrity::IntegrityVerifier;
use crate::sources::repository::{self, RepositoryResolver};
use log::{debug, info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Coordinates of the artifact to fetch
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub plugin_key: String,
    pub host_version: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
}

impl DownloadRequest {
    fn relative_path(&self) -> String {
        repository::artifact_path(
            &self.group_id,
            &self.artifact_id,
            &self.version,
            self.classifier.as_deref(),
            PACKAGING,
        )
    }
}

/// A verified artifact in a private staging directory, deleted on drop
#[derive(Debug)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub url: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    _staging: TempDir,
}

/// Why one repository attempt was abandoned
enum AttemptFailure {
    Unavailable(KpmError),
    Rejected(KpmError),
}

pub struct ArtifactDownloader {
    http: HttpClient,
    primary: RepositoryResolver,
    fallback: Option<RepositoryResolver>,
    verifier: IntegrityVerifier,
}

impl ArtifactDownloader {
    /// `fallback` is dropped when it would only repeat the primary repository
    pub fn new(
        http: HttpClient,
        primary: RepositoryResolver,
        fallback: Option<RepositoryResolver>,
        verifier: IntegrityVerifier,
    ) -> Self {
        let fallback = fallback.filter(|public| {
            !primary.is_public() && !primary.same_location(public)
        });
        Self {
            http,
            primary,
            fallback,
            verifier,
        }
    }

    /// Repositories tried, in order
    pub fn repositories(&self) -> Vec<&RepositoryResolver> {
        std::iter::once(&self.primary)
            .chain(self.fallback.as_ref())
            .collect()
    }

    /// Download the first copy that is a readable archive with a matching checksum.
    ///
    /// Per-repository failures are logged. When every repository fails, a
    /// rejected download is reported as an integrity error; otherwise the
    /// artifact is reported as not found.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult> {
        let relative_path = request.relative_path();
        let mut rejection = None;

        for repository in self.repositories() {
            let url = repository.artifact_url(&relative_path);
            match self.attempt(repository, &url, request).await {
                Ok(result) => {
                    info!("Downloaded {} from {}", request.artifact_id, url);
                    return Ok(result);
                }
                Err(AttemptFailure::Unavailable(e)) => {
                    warn!("Unable to download {}: {}", url, e);
                }
                Err(AttemptFailure::Rejected(e)) => {
                    warn!("Discarding {}: {}", url, e);
                    rejection.get_or_insert(e);
                }
            }
        }

        Err(rejection.unwrap_or_else(|| KpmError::ArtifactNotFound {
            plugin_key: request.plugin_key.clone(),
            host_version: request.host_version.clone(),
            group_id: request.group_id.clone(),
            artifact_id: request.artifact_id.clone(),
            version: request.version.clone(),
        }))
    }

    async fn attempt(
        &self,
        repository: &RepositoryResolver,
        url: &str,
        request: &DownloadRequest,
    ) -> std::result::Result<DownloadResult, AttemptFailure> {
        let staging = TempDir::new().map_err(|e| AttemptFailure::Unavailable(e.into()))?;
        let relative_path = request.relative_path();
        let path = staging.path().join(relative_file_name(&relative_path));

        debug!("Fetching {}", url);
        self.http
            .download_to(url, repository.auth(), &path)
            .await
            .map_err(AttemptFailure::Unavailable)?;

        validate_archive(&path).map_err(AttemptFailure::Rejected)?;

        let digest_url = format!("{}.sha1", url);
        if !self.verifier.verify(&digest_url, repository.auth(), &path).await {
            return Err(AttemptFailure::Rejected(KpmError::Integrity {
                artifact: url.to_string(),
                reason: "SHA-1 checksum did not match".into(),
            }));
        }

        Ok(DownloadResult {
            path,
            url: url.to_string(),
            group_id: request.group_id.clone(),
            artifact_id: request.artifact_id.clone(),
            version: request.version.clone(),
            _staging: staging,
        })
    }
}

fn relative_file_name(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

/// Fail unless `path` opens as a zip/jar archive
pub fn validate_archive(path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| KpmError::fs(path, e))?;
    zip::ZipArchive::new(file)
        .map(|_| ())
        .map_err(|e| KpmError::Integrity {
            artifact: path.display().to_string(),
            reason: format!("not a valid archive: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use crate::sources::hash;
    use crate::sources::http::HttpSettings;
    use crate::sources::repository::AuthStrategy;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn jar_bytes() -> Vec<u8> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_download_stages_file_from_fallback() {
        let primary = MockServer::start().await;
        let public = MockServer::start().await;
        let jar = jar_bytes();
        let jar_path = "/maven2/org/kill-bill/billing/plugin/java/stripe-plugin/8.0.0/stripe-plugin-8.0.0.jar";
        Mock::given(method("GET"))
            .and(path(jar_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jar.clone()))
            .mount(&public)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}.sha1", jar_path)))
            .respond_with(ResponseTemplate::new(200).set_body_string(hash::sha1_hex(&jar)))
            .mount(&public)
            .await;

        let http = HttpClient::new(&HttpSettings {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            strict_ssl: true,
        })
        .unwrap();
        let downloader = ArtifactDownloader::new(
            http.clone(),
            RepositoryResolver::new(&format!("{}/repo", primary.uri()), AuthStrategy::None).unwrap(),
            Some(
                RepositoryResolver::new(&format!("{}/maven2", public.uri()), AuthStrategy::None)
                    .unwrap(),
            ),
            IntegrityVerifier::new(http, true),
        );

        let result = downloader
            .download(&DownloadRequest {
                plugin_key: "stripe".into(),
                host_version: "0.24.0".into(),
                group_id: "org.kill-bill.billing.plugin.java".into(),
                artifact_id: "stripe-plugin".into(),
                version: "8.0.0".into(),
                classifier: None,
            })
            .await
            .unwrap();

        assert_eq!(result.path.file_name().unwrap(), "stripe-plugin-8.0.0.jar");
        assert_eq!(fs::read(&result.path).unwrap(), jar);
        assert!(result.url.starts_with(&public.uri()));
    }

    #[test]
    fn test_validate_archive() {
        let dir = TempDir::new().unwrap();

        let good = dir.path().join("good.jar");
        let mut zip = ZipWriter::new(File::create(&good).unwrap());
        zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
        zip.finish().unwrap();
        assert!(validate_archive(&good).is_ok());

        let bad = dir.path().join("bad.jar");
        fs::write(&bad, b"<html>not found</html>").unwrap();
        assert!(matches!(
            validate_archive(&bad),
            Err(KpmError::Integrity { .. })
        ));
    }

    #[test]
    fn test_relative_path() {
        let request = DownloadRequest {
            plugin_key: "stripe".into(),
            host_version: "0.24.0".into(),
            group_id: "org.kill-bill.billing.plugin.java".into(),
            artifact_id: "stripe-plugin".into(),
            version: "8.0.0".into(),
            classifier: None,
        };
        let path = request.relative_path();
        assert_eq!(
            path,
            "org/kill-bill/billing/plugin/java/stripe-plugin/8.0.0/stripe-plugin-8.0.0.jar"
        );
        assert_eq!(relative_file_name(&path), "stripe-plugin-8.0.0.jar");
    }
}
