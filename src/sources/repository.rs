// Remote artifact repositories and how to authenticate against them

use crate::constants::{PUBLIC_REPOSITORY_HOSTS, PUBLIC_REPOSITORY_URL};
use crate::error::{KpmError, Result};
use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How requests to a repository are authenticated
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthStrategy {
    #[default]
    None,
    Basic { username: String, password: String },
    Token { token: String },
}

impl AuthStrategy {
    /// Attach the credentials to an outgoing request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            AuthStrategy::None => request,
            AuthStrategy::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthStrategy::Token { token } => request.bearer_auth(token),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AuthStrategy::None => Ok(()),
            AuthStrategy::Basic { username, .. } if username.trim().is_empty() => Err(
                KpmError::Configuration("basic auth requires a username".into()),
            ),
            AuthStrategy::Token { token } if token.trim().is_empty() => Err(
                KpmError::Configuration("token auth requires a token".into()),
            ),
            _ => Ok(()),
        }
    }
}

// Credentials stay out of logs
impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStrategy::None => f.write_str("None"),
            AuthStrategy::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish()
            }
            AuthStrategy::Token { .. } => f.write_str("Token"),
        }
    }
}

/// A Maven-layout repository: base URI plus credentials
#[derive(Debug, Clone)]
pub struct RepositoryResolver {
    base: Url,
    auth: AuthStrategy,
}

impl RepositoryResolver {
    /// Validates `url` eagerly so a bad repository fails at startup
    pub fn new(url: &str, auth: AuthStrategy) -> Result<Self> {
        let base = Url::parse(url.trim_end_matches('/')).map_err(|e| {
            KpmError::Configuration(format!("invalid repository URL '{}': {}", url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(KpmError::Configuration(format!(
                "repository URL '{}' must use http or https",
                url
            )));
        }
        auth.validate()?;
        Ok(Self { base, auth })
    }

    /// The anonymous public repository
    pub fn public() -> Result<Self> {
        Self::new(PUBLIC_REPOSITORY_URL, AuthStrategy::None)
    }

    pub fn base_uri(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn auth(&self) -> &AuthStrategy {
        &self.auth
    }

    /// Whether this repository is itself one of the public hosts
    pub fn is_public(&self) -> bool {
        self.base
            .host_str()
            .map(|host| PUBLIC_REPOSITORY_HOSTS.contains(&host))
            .unwrap_or(false)
    }

    /// Same host and path as `other`, ignoring credentials
    pub fn same_location(&self, other: &RepositoryResolver) -> bool {
        self.base_uri() == other.base_uri()
    }

    /// Whether `uri` lies under this repository: same scheme, host and port,
    /// and a path equal to or below the base path
    pub fn contains(&self, uri: &str) -> bool {
        let Ok(url) = Url::parse(uri) else {
            return false;
        };
        if url.scheme() != self.base.scheme()
            || url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return false;
        }
        let base_path = self.base.path().trim_end_matches('/');
        let path = url.path();
        base_path.is_empty()
            || path == base_path
            || path
                .strip_prefix(base_path)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// `<base>/<relative_path>`
    pub fn artifact_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_uri(),
            relative_path.trim_start_matches('/')
        )
    }
}

/// `<group/with/slashes>/<artifact>`
pub fn artifact_root(group_id: &str, artifact_id: &str) -> String {
    format!("{}/{}", group_id.replace('.', "/"), artifact_id)
}

/// `<group/with/slashes>/<artifact>/<version>/<artifact>-<version>[-<classifier>].<packaging>`
pub fn artifact_path(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    classifier: Option<&str>,
    packaging: &str,
) -> String {
    let file_name = match classifier {
        Some(classifier) => format!("{}-{}-{}.{}", artifact_id, version, classifier, packaging),
        None => format!("{}-{}.{}", artifact_id, version, packaging),
    };
    format!(
        "{}/{}/{}",
        artifact_root(group_id, artifact_id),
        version,
        file_name
    )
}
