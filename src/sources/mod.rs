// Remote-facing components: repositories, metadata, resolution and download

pub mod cache;
pub mod directory;
pub mod downloader;
pub mod hash;
pub mod http;
pub mod integrity;
pub mod metadata;
pub mod repository;
pub mod resolver;
pub mod source_trait;

pub use cache::{CacheSettings, MetadataCache};
pub use directory::{DirectoryListing, PluginDirectory};
pub use downloader::{ArtifactDownloader, DownloadRequest, DownloadResult};
pub use http::{HttpClient, HttpSettings};
pub use integrity::IntegrityVerifier;
pub use metadata::MetadataClient;
pub use repository::{AuthStrategy, RepositoryResolver};
pub use resolver::{ArtifactResolver, ResolvedArtifact};
pub use source_trait::{DirectoryEntry, DirectoryLookup, IdentifierLookup};
