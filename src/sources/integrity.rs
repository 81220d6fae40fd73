// SHA-1 verification of downloaded artifacts against their companion digest

use crate::sources::hash;
use crate::sources::http::HttpClient;
use crate::sources::repository::AuthStrategy;
use log::{debug, warn};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    http: HttpClient,
    enabled: bool,
}

impl IntegrityVerifier {
    pub fn new(http: HttpClient, enabled: bool) -> Self {
        Self { http, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compare the file's SHA-1 with the digest published at `digest_url`.
    ///
    /// Always true when verification is disabled. Any failure to read the
    /// file or fetch the digest counts as a mismatch.
    pub async fn verify(&self, digest_url: &str, auth: &AuthStrategy, file: &Path) -> bool {
        if !self.enabled {
            debug!("Checksum verification disabled, accepting {}", file.display());
            return true;
        }

        let actual = match hash::file_sha1(file) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Unable to hash {}: {}", file.display(), e);
                return false;
            }
        };

        let expected = match self.http.fetch_text(digest_url, auth).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Unable to fetch checksum {}: {}", digest_url, e);
                return false;
            }
        };

        match hash::parse_digest_file(&expected) {
            Some(expected) if expected.eq_ignore_ascii_case(&actual) => true,
            Some(expected) => {
                warn!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    file.display(),
                    expected,
                    actual
                );
                false
            }
            None => {
                warn!("Empty checksum document at {}", digest_url);
                false
            }
        }
    }
}
