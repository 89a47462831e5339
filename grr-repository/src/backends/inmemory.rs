//! In-memory repository backend.
//!
//! Holds the whole repository as a path-to-bytes map. Used for tests
//! and for small embedded repositories shipped inside other tools.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use crate::config::ResourceConfig;
use crate::error::{RepositoryError, Result};
use crate::manifest::{CONFIG_FILE_NAME, Manifest, ManifestEntry, compute_md5};
use crate::protocol::{ReadSeek, ResourceEntry, Repository, RepositoryProtocol};
use crate::version::parse_versioned_token;

pub struct InMemoryProtocol {
    repo_id: String,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryProtocol {
    /// Build from a map of `dir/subdir(version)/filename` paths to
    /// file content. Every directory holding a `genomic_resource.yaml`
    /// is a resource.
    pub fn new(repo_id: &str, files: BTreeMap<String, Vec<u8>>) -> InMemoryProtocol {
        InMemoryProtocol {
            repo_id: repo_id.to_string(),
            files: Mutex::new(files),
        }
    }

    /// Replace or add one file. Later reads observe the new content.
    pub fn set_file(&self, path: &str, content: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content);
    }

    fn resource_dir(entry: &ResourceEntry) -> String {
        let mut tokens: Vec<&str> = entry.id.split('/').collect();
        let full_id = entry.full_id();
        let last = full_id.rsplit('/').next().unwrap_or(&full_id);
        let n = tokens.len();
        tokens[n - 1] = last;
        tokens.join("/")
    }

    fn file_key(entry: &ResourceEntry, filename: &str) -> String {
        format!("{}/{}", Self::resource_dir(entry), filename)
    }

    fn get_file(&self, entry: &ResourceEntry, filename: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&Self::file_key(entry, filename))
            .cloned()
            .ok_or_else(|| RepositoryError::FileNotFound {
                resource_id: entry.id.clone(),
                filename: filename.to_string(),
            })
    }
}

impl RepositoryProtocol for InMemoryProtocol {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    fn url(&self) -> String {
        format!("memory://{}", self.repo_id)
    }

    fn resource_entries(&self) -> Result<Vec<ResourceEntry>> {
        let files = self.files.lock().unwrap();
        let mut entries = Vec::new();
        for (path, content) in files.iter() {
            let Some(dir) = path.strip_suffix(&format!("/{}", CONFIG_FILE_NAME)) else {
                continue;
            };
            let mut id_tokens = Vec::new();
            let mut version = None;
            let token_count = dir.split('/').count();
            for (index, token) in dir.split('/').enumerate() {
                let (name, token_version) = parse_versioned_token(token)?;
                if index + 1 == token_count {
                    version = Some(token_version);
                } else if !token_version.is_default() {
                    return Err(RepositoryError::InvalidResourceId(dir.to_string()));
                }
                id_tokens.push(name);
            }
            let id = id_tokens.join("/");
            let text = String::from_utf8_lossy(content);
            let config = ResourceConfig::from_yaml_str(&id, &text)?;
            entries.push(ResourceEntry {
                id,
                version: version.unwrap_or_default(),
                config,
            });
        }
        Ok(entries)
    }

    fn open_raw_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.get_file(entry, filename)?)))
    }

    fn open_seekable_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.get_file(entry, filename)?)))
    }

    fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .contains_key(&Self::file_key(entry, filename)))
    }

    fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
        let prefix = format!("{}/", Self::resource_dir(entry));
        let files = self.files.lock().unwrap();
        let mut manifest = Manifest::new();
        for (path, content) in files.range(prefix.clone()..) {
            let Some(name) = path.strip_prefix(&prefix) else {
                break;
            };
            if name.split('/').any(|part| part.starts_with('.')) {
                continue;
            }
            let (size, md5) = compute_md5(&mut Cursor::new(content))?;
            manifest.add(ManifestEntry {
                name: name.to_string(),
                size,
                md5,
                timestamp: None,
            });
        }
        Ok(manifest)
    }
}

/// Convenience constructor for an in-memory [`Repository`].
pub fn build_inmemory_repository(
    repo_id: &str,
    files: BTreeMap<String, Vec<u8>>,
) -> Repository {
    Repository::new(Arc::new(InMemoryProtocol::new(repo_id, files)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn demo_files() -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        files.insert(
            "hg38/scores(1.0)/genomic_resource.yaml".to_string(),
            b"type: position_score\n".to_vec(),
        );
        files.insert(
            "hg38/scores(1.0)/data.txt".to_string(),
            b"1\t10\t0.5\n".to_vec(),
        );
        files.insert(
            "hg38/scores(1.2)/genomic_resource.yaml".to_string(),
            b"type: position_score\n".to_vec(),
        );
        files.insert(
            "hg38/genome/genomic_resource.yaml".to_string(),
            b"type: genome\n".to_vec(),
        );
        files
    }

    #[test]
    fn test_enumerates_resources() {
        let repo = build_inmemory_repository("demo", demo_files());
        let resources = repo.all_resources().unwrap();
        let ids: Vec<String> = resources.iter().map(|r| r.full_id()).collect();
        assert_eq!(
            ids,
            vec!["hg38/genome", "hg38/scores(1.0)", "hg38/scores(1.2)"]
        );
    }

    #[test]
    fn test_version_resolution_picks_highest() {
        let repo = build_inmemory_repository("demo", demo_files());
        let resource = repo.get_resource("hg38/scores", None).unwrap();
        assert_eq!(resource.full_id(), "hg38/scores(1.2)");

        let pinned = repo.get_resource("hg38/scores", Some("=1.0")).unwrap();
        assert_eq!(pinned.full_id(), "hg38/scores(1.0)");

        let err = repo.get_resource("hg38/scores", Some(">=2.0")).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ResourceNotFound { .. }
        ));
    }

    #[test]
    fn test_file_access() {
        let repo = build_inmemory_repository("demo", demo_files());
        let resource = repo.get_resource("hg38/scores", Some("=1.0")).unwrap();
        assert!(resource.file_exists("data.txt").unwrap());
        assert!(!resource.file_exists("absent.txt").unwrap());
        assert_eq!(resource.file_content("data.txt").unwrap(), b"1\t10\t0.5\n");
    }

    #[test]
    fn test_manifest_skips_dotfiles() {
        let files = {
            let mut files = demo_files();
            files.insert(
                "hg38/genome/.MANIFEST".to_string(),
                b"stale".to_vec(),
            );
            files
        };
        let repo = build_inmemory_repository("demo", files);
        let resource = repo.get_resource("hg38/genome", None).unwrap();
        let manifest = resource.manifest().unwrap();
        let names: Vec<&str> = manifest.names().collect();
        assert_eq!(names, vec!["genomic_resource.yaml"]);
    }
}
