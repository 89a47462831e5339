//! Genomic resource repositories.
//!
//! A repository is a collection of versioned resources, each a
//! directory with a `genomic_resource.yaml` configuration, data files
//! and a `.MANIFEST`. Backends serve files from the local filesystem,
//! from memory or over HTTP; the caching decorator materializes remote
//! files locally keyed by manifest md5.

pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod group;
pub mod manifest;
pub mod protocol;
pub mod version;

pub use backends::dir::DirectoryProtocol;
pub use backends::http::HttpProtocol;
pub use backends::inmemory::{InMemoryProtocol, build_inmemory_repository};
pub use cache::{CachingProtocol, cache_repository};
pub use config::ResourceConfig;
pub use error::{RepositoryError, Result};
pub use factory::{
    RepositoriesConfig, RepositoryDefinition, build_group, build_repository,
};
pub use group::GroupRepository;
pub use manifest::{
    CONFIG_FILE_NAME, CONTENTS_FILE_NAME, MANIFEST_FILE_NAME, Manifest, ManifestEntry,
};
pub use protocol::{ReadSeek, Repository, RepositoryProtocol, Resource, ResourceEntry};
pub use version::{ResourceVersion, VersionConstraint};
