//! The repository protocol trait and its user-facing wrappers.

use std::io::{Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;

use grr_core::utils::maybe_decompress;

use crate::config::ResourceConfig;
use crate::error::{RepositoryError, Result};
use crate::manifest::{Manifest, compute_md5};
use crate::version::{ResourceVersion, VersionConstraint, versioned_id};

/// Combined read+seek object trait for random access to resource files.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A resource as enumerated by a backend: identity plus parsed
/// configuration, with no file access of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub id: String,
    pub version: ResourceVersion,
    pub config: ResourceConfig,
}

impl ResourceEntry {
    /// Storage name of the resource: `<id>` or `<id>(<version>)`.
    pub fn full_id(&self) -> String {
        versioned_id(&self.id, &self.version)
    }
}

/// Storage backend of a repository.
///
/// Implementations enumerate resources and serve their files; all
/// higher-level behavior (version resolution, caching, manifests) is
/// built on top of these primitives.
pub trait RepositoryProtocol: Send + Sync {
    fn repo_id(&self) -> &str;

    /// Human-readable location of the backend (path or URL).
    fn url(&self) -> String;

    fn resource_entries(&self) -> Result<Vec<ResourceEntry>>;

    /// Open a file of a resource for sequential reading.
    fn open_raw_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>>;

    /// Open a file of a resource for random access.
    fn open_seekable_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn ReadSeek>>;

    fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool>;

    fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest>;

    /// Local filesystem path of a resource file, for backends that can
    /// provide one. Tools that need a real path (e.g. external index
    /// readers) go through a caching layer when the backend cannot.
    fn local_file_path(
        &self,
        _entry: &ResourceEntry,
        _filename: &str,
    ) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// A repository of genomic resources backed by some protocol.
#[derive(Clone)]
pub struct Repository {
    protocol: Arc<dyn RepositoryProtocol>,
}

impl Repository {
    pub fn new(protocol: Arc<dyn RepositoryProtocol>) -> Repository {
        Repository { protocol }
    }

    pub fn repo_id(&self) -> &str {
        self.protocol.repo_id()
    }

    pub fn url(&self) -> String {
        self.protocol.url()
    }

    pub fn protocol(&self) -> &Arc<dyn RepositoryProtocol> {
        &self.protocol
    }

    /// All resources of the repository, sorted by id and version.
    pub fn all_resources(&self) -> Result<Vec<Resource>> {
        let mut entries = self.protocol.resource_entries()?;
        entries.sort_by(|a, b| (&a.id, &a.version).cmp(&(&b.id, &b.version)));
        Ok(entries
            .into_iter()
            .map(|entry| Resource {
                entry,
                protocol: Arc::clone(&self.protocol),
            })
            .collect())
    }

    /// Find a resource by id, honoring an optional version constraint.
    ///
    /// Among the versions that satisfy the constraint the highest one
    /// is returned; `Ok(None)` when no version matches.
    pub fn find_resource(
        &self,
        resource_id: &str,
        constraint: Option<&str>,
    ) -> Result<Option<Resource>> {
        let constraint = match constraint {
            Some(text) => Some(VersionConstraint::parse(text)?),
            None => None,
        };
        let mut best: Option<ResourceEntry> = None;
        for entry in self.protocol.resource_entries()? {
            if entry.id != resource_id {
                continue;
            }
            if let Some(constraint) = &constraint {
                if !constraint.matches(&entry.version) {
                    continue;
                }
            }
            match &best {
                Some(current) if current.version >= entry.version => {}
                _ => best = Some(entry),
            }
        }
        Ok(best.map(|entry| Resource {
            entry,
            protocol: Arc::clone(&self.protocol),
        }))
    }

    /// Like [`Repository::find_resource`] but failing when absent.
    pub fn get_resource(
        &self,
        resource_id: &str,
        constraint: Option<&str>,
    ) -> Result<Resource> {
        self.find_resource(resource_id, constraint)?.ok_or_else(|| {
            RepositoryError::ResourceNotFound {
                resource_id: resource_id.to_string(),
                constraint: constraint.map(str::to_string),
            }
        })
    }
}

/// A single resolved resource. Cheap to clone; file access goes back
/// through the owning protocol.
#[derive(Clone)]
pub struct Resource {
    entry: ResourceEntry,
    protocol: Arc<dyn RepositoryProtocol>,
}

impl Resource {
    pub fn new(entry: ResourceEntry, protocol: Arc<dyn RepositoryProtocol>) -> Resource {
        Resource { entry, protocol }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn version(&self) -> &ResourceVersion {
        &self.entry.version
    }

    pub fn full_id(&self) -> String {
        self.entry.full_id()
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.entry.config
    }

    pub fn resource_type(&self) -> &str {
        self.entry.config.resource_type()
    }

    pub fn entry(&self) -> &ResourceEntry {
        &self.entry
    }

    pub fn repo_id(&self) -> &str {
        self.protocol.repo_id()
    }

    pub fn file_exists(&self, filename: &str) -> Result<bool> {
        self.protocol.file_exists(&self.entry, filename)
    }

    /// Open a file for sequential reading, transparently decompressing
    /// `.gz` content when `uncompress` is set.
    pub fn open_raw_file(
        &self,
        filename: &str,
        uncompress: bool,
    ) -> Result<Box<dyn Read>> {
        let reader = self.protocol.open_raw_file(&self.entry, filename)?;
        if uncompress {
            Ok(maybe_decompress(filename, reader))
        } else {
            Ok(reader)
        }
    }

    pub fn open_seekable_file(&self, filename: &str) -> Result<Box<dyn ReadSeek>> {
        self.protocol.open_seekable_file(&self.entry, filename)
    }

    pub fn file_content(&self, filename: &str) -> Result<Vec<u8>> {
        let mut reader = self.open_raw_file(filename, true)?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(content)
    }

    pub fn file_string(&self, filename: &str) -> Result<String> {
        let content = self.file_content(filename)?;
        String::from_utf8(content).map_err(|err| RepositoryError::Config {
            resource_id: self.entry.id.clone(),
            message: format!("file <{}> is not valid UTF-8: {}", filename, err),
        })
    }

    pub fn manifest(&self) -> Result<Manifest> {
        self.protocol.load_manifest(&self.entry)
    }

    pub fn local_file_path(&self, filename: &str) -> Result<Option<PathBuf>> {
        self.protocol.local_file_path(&self.entry, filename)
    }

    /// Compute the md5 digest of a file from its raw bytes.
    pub fn compute_file_md5(&self, filename: &str) -> Result<String> {
        let mut reader = self.protocol.open_raw_file(&self.entry, filename)?;
        let (_, md5) = compute_md5(&mut reader)?;
        Ok(md5)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.entry.id)
            .field("version", &self.entry.version)
            .field("repo_id", &self.protocol.repo_id())
            .finish()
    }
}
