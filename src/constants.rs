// Constants module for shared string constants

/// Name of the link pointing at the active version of a plugin
pub const ACTIVE_LINK: &str = "SET_DEFAULT";

/// Identifier store document, relative to the plugins directory
pub const IDENTIFIERS_FILE: &str = "plugin_identifiers.json";

pub const PLUGINS_DIR: &str = "plugins";
pub const CONFIG_FILE: &str = "kpm.toml";
pub const DEFAULT_BUNDLES_ROOT: &str = "/var/tmp/bundles";

pub const PLUGIN_SUFFIX: &str = "-plugin";
pub const PACKAGING: &str = "jar";
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Host version placeholder meaning "whatever the repository calls its latest release"
pub const LATEST: &str = "LATEST";

pub const PUBLIC_REPOSITORY_URL: &str = "https://repo1.maven.org/maven2";

/// Hosts already serving the public repository; no fallback is attempted from these
pub const PUBLIC_REPOSITORY_HOSTS: &[&str] = &[
    "repo1.maven.org",
    "repo.maven.apache.org",
    "central.maven.org",
    "oss.sonatype.org",
];

pub const PLUGIN_DIRECTORY_URL: &str =
    "https://raw.githubusercontent.com/killbill/killbill-cloud/master/kpm/lib/kpm/plugins_directory.yml";

pub const DEFAULT_GROUP_ID: &str = "org.kill-bill.billing.plugin.java";
pub const HOST_GROUP_ID: &str = "org.kill-bill.billing";
pub const HOST_ARTIFACT_ID: &str = "killbill";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CACHE_ENTRIES: usize = 32;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
