//! Caching repository decorator.
//!
//! Wraps any backend and materializes files on the local filesystem
//! under `<cache_dir>/<repo_id>/<resource_full_id>/<filename>` before
//! serving them. A cached copy is valid while its recorded md5 matches
//! the manifest entry of the upstream resource; a mismatch triggers a
//! refetch. There is no TTL eviction.

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use md5::{Digest, Md5};

use crate::backends::dir::{atomic_write, temp_sibling};
use crate::error::{RepositoryError, Result};
use crate::manifest::Manifest;
use crate::protocol::{ReadSeek, Repository, ResourceEntry, RepositoryProtocol};

pub struct CachingProtocol {
    inner: Arc<dyn RepositoryProtocol>,
    cache_dir: PathBuf,
}

impl CachingProtocol {
    pub fn new(inner: Arc<dyn RepositoryProtocol>, cache_dir: PathBuf) -> CachingProtocol {
        CachingProtocol { inner, cache_dir }
    }

    fn cached_path(&self, entry: &ResourceEntry, filename: &str) -> PathBuf {
        let mut path = self.cache_dir.join(self.inner.repo_id());
        for token in entry.full_id().split('/') {
            path.push(token);
        }
        for part in filename.split('/') {
            path.push(part);
        }
        path
    }

    fn md5_sidecar(path: &PathBuf) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.md5", name))
    }

    fn recorded_md5(path: &PathBuf) -> Option<String> {
        fs::read_to_string(Self::md5_sidecar(path))
            .ok()
            .map(|text| text.trim().to_string())
    }

    fn fetch(&self, entry: &ResourceEntry, filename: &str, dest: &PathBuf) -> Result<String> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_sibling(dest);
        let result = (|| -> Result<String> {
            let mut reader = self.inner.open_raw_file(entry, filename)?;
            let mut out = File::create(&tmp)?;
            let mut hasher = Md5::new();
            let mut buffer = [0u8; 64 * 1024];
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
                std::io::Write::write_all(&mut out, &buffer[..n])?;
            }
            out.sync_all()?;
            drop(out);
            fs::rename(&tmp, dest)?;
            Ok(format!("{:x}", hasher.finalize()))
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        let md5 = result?;
        atomic_write(&Self::md5_sidecar(dest), md5.as_bytes())?;
        Ok(md5)
    }

    /// Return the local path of a file, downloading it when the cached
    /// copy is missing or stale.
    pub fn ensure_cached(&self, entry: &ResourceEntry, filename: &str) -> Result<PathBuf> {
        let manifest = self.inner.load_manifest(entry)?;
        let Some(wanted) = manifest.get(filename) else {
            return Err(RepositoryError::FileNotFound {
                resource_id: entry.id.clone(),
                filename: filename.to_string(),
            });
        };
        let dest = self.cached_path(entry, filename);
        if dest.is_file() && Self::recorded_md5(&dest).as_deref() == Some(wanted.md5.as_str())
        {
            return Ok(dest);
        }
        debug!(resource_id = %entry.id, file = filename, "fetching into cache");
        let mut md5 = self.fetch(entry, filename, &dest)?;
        if md5 != wanted.md5 {
            warn!(
                resource_id = %entry.id,
                file = filename,
                "cached content did not match manifest md5, refetching"
            );
            md5 = self.fetch(entry, filename, &dest)?;
        }
        if md5 != wanted.md5 {
            let _ = fs::remove_file(&dest);
            let _ = fs::remove_file(Self::md5_sidecar(&dest));
            return Err(RepositoryError::CacheConsistency {
                resource_id: entry.id.clone(),
                filename: filename.to_string(),
            });
        }
        Ok(dest)
    }
}

impl RepositoryProtocol for CachingProtocol {
    fn repo_id(&self) -> &str {
        self.inner.repo_id()
    }

    fn url(&self) -> String {
        self.inner.url()
    }

    fn resource_entries(&self) -> Result<Vec<ResourceEntry>> {
        self.inner.resource_entries()
    }

    fn open_raw_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>> {
        let path = self.ensure_cached(entry, filename)?;
        Ok(Box::new(File::open(path)?))
    }

    fn open_seekable_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn ReadSeek>> {
        let path = self.ensure_cached(entry, filename)?;
        Ok(Box::new(File::open(path)?))
    }

    fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool> {
        self.inner.file_exists(entry, filename)
    }

    fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
        self.inner.load_manifest(entry)
    }

    fn local_file_path(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = self.inner.local_file_path(entry, filename)? {
            return Ok(Some(path));
        }
        Ok(Some(self.ensure_cached(entry, filename)?))
    }
}

/// Wrap a repository in a local file cache.
pub fn cache_repository(repository: &Repository, cache_dir: PathBuf) -> Repository {
    Repository::new(Arc::new(CachingProtocol::new(
        Arc::clone(repository.protocol()),
        cache_dir,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::backends::inmemory::InMemoryProtocol;

    /// Counts upstream content fetches, leaving everything else alone.
    struct CountingProtocol {
        inner: InMemoryProtocol,
        fetches: AtomicUsize,
    }

    impl RepositoryProtocol for CountingProtocol {
        fn repo_id(&self) -> &str {
            self.inner.repo_id()
        }

        fn url(&self) -> String {
            self.inner.url()
        }

        fn resource_entries(&self) -> Result<Vec<ResourceEntry>> {
            self.inner.resource_entries()
        }

        fn open_raw_file(
            &self,
            entry: &ResourceEntry,
            filename: &str,
        ) -> Result<Box<dyn Read + Send>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.open_raw_file(entry, filename)
        }

        fn open_seekable_file(
            &self,
            entry: &ResourceEntry,
            filename: &str,
        ) -> Result<Box<dyn ReadSeek>> {
            self.inner.open_seekable_file(entry, filename)
        }

        fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool> {
            self.inner.file_exists(entry, filename)
        }

        fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
            self.inner.load_manifest(entry)
        }
    }

    fn demo_setup() -> (TempDir, Arc<CountingProtocol>, Repository) {
        let mut files = BTreeMap::new();
        files.insert(
            "scores/genomic_resource.yaml".to_string(),
            b"type: position_score\n".to_vec(),
        );
        files.insert("scores/data.txt".to_string(), b"original".to_vec());
        let counting = Arc::new(CountingProtocol {
            inner: InMemoryProtocol::new("demo", files),
            fetches: AtomicUsize::new(0),
        });
        let cache_dir = TempDir::new().unwrap();
        let cached = Repository::new(Arc::new(CachingProtocol::new(
            Arc::clone(&counting) as Arc<dyn RepositoryProtocol>,
            cache_dir.path().to_path_buf(),
        )));
        (cache_dir, counting, cached)
    }

    #[test]
    fn test_cache_hit_skips_upstream() {
        let (_cache_dir, counting, repo) = demo_setup();
        let resource = repo.get_resource("scores", None).unwrap();

        assert_eq!(resource.file_content("data.txt").unwrap(), b"original");
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 1);

        assert_eq!(resource.file_content("data.txt").unwrap(), b"original");
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manifest_change_invalidates() {
        let (_cache_dir, counting, repo) = demo_setup();
        let resource = repo.get_resource("scores", None).unwrap();
        assert_eq!(resource.file_content("data.txt").unwrap(), b"original");

        counting
            .inner
            .set_file("scores/data.txt", b"updated!".to_vec());
        assert_eq!(resource.file_content("data.txt").unwrap(), b"updated!");
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_layout() {
        let (cache_dir, _counting, repo) = demo_setup();
        let resource = repo.get_resource("scores", None).unwrap();
        let path = resource.local_file_path("data.txt").unwrap().unwrap();
        assert_eq!(
            path,
            cache_dir.path().join("demo").join("scores").join("data.txt")
        );
        assert!(path.is_file());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let (_cache_dir, _counting, repo) = demo_setup();
        let resource = repo.get_resource("scores", None).unwrap();
        let err = resource.file_content("absent.txt").unwrap_err();
        assert!(matches!(err, RepositoryError::FileNotFound { .. }));
    }
}
