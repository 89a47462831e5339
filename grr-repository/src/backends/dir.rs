//! Local directory repository backend.
//!
//! The only read-write backend: besides serving files it can build and
//! repair manifests, store files, and regenerate the repository
//! contents index consumed by the HTTP backend.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResourceConfig;
use crate::error::{RepositoryError, Result};
use crate::manifest::{
    CONFIG_FILE_NAME, CONTENTS_FILE_NAME, ContentsEntry, MANIFEST_FILE_NAME, Manifest,
    ManifestEntry, compute_md5,
};
use crate::protocol::{ReadSeek, ResourceEntry, RepositoryProtocol};
use crate::version::parse_versioned_token;

const STATE_DIR_NAME: &str = ".grr";

/// Recorded md5 of a file at a given size/timestamp; lets manifest
/// rebuilds skip hashing unchanged files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileState {
    size: u64,
    timestamp: String,
    md5: String,
}

pub struct DirectoryProtocol {
    repo_id: String,
    root: PathBuf,
}

impl DirectoryProtocol {
    pub fn new(repo_id: &str, root: &Path) -> DirectoryProtocol {
        DirectoryProtocol {
            repo_id: repo_id.to_string(),
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resource_dir(&self, entry: &ResourceEntry) -> PathBuf {
        let mut dir = self.root.clone();
        let full_id = entry.full_id();
        for token in full_id.split('/') {
            dir.push(token);
        }
        dir
    }

    fn file_path(&self, entry: &ResourceEntry, filename: &str) -> PathBuf {
        let mut path = self.resource_dir(entry);
        for part in filename.split('/') {
            path.push(part);
        }
        path
    }

    fn scan_dir(
        &self,
        dir: &Path,
        id_tokens: &mut Vec<String>,
        entries: &mut Vec<ResourceEntry>,
    ) -> Result<()> {
        if !id_tokens.is_empty() && dir.join(CONFIG_FILE_NAME).is_file() {
            let (id, version) = {
                let mut version = Default::default();
                let mut tokens = Vec::with_capacity(id_tokens.len());
                for (index, token) in id_tokens.iter().enumerate() {
                    let (name, token_version) = parse_versioned_token(token)?;
                    if index + 1 == id_tokens.len() {
                        version = token_version;
                    } else if !token_version.is_default() {
                        return Err(RepositoryError::InvalidResourceId(
                            id_tokens.join("/"),
                        ));
                    }
                    tokens.push(name);
                }
                (tokens.join("/"), version)
            };
            let text = fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
            let config = ResourceConfig::from_yaml_str(&id, &text)?;
            entries.push(ResourceEntry {
                id,
                version,
                config,
            });
            return Ok(());
        }
        let Ok(dir_entries) = fs::read_dir(dir) else {
            return Ok(());
        };
        let mut names: Vec<String> = dir_entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort_unstable();
        for name in names {
            id_tokens.push(name.clone());
            self.scan_dir(&dir.join(&name), id_tokens, entries)?;
            id_tokens.pop();
        }
        Ok(())
    }

    /// Relative names of all resource files, sorted, dotfiles skipped.
    fn collect_filenames(&self, entry: &ResourceEntry) -> Result<Vec<String>> {
        fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
            for dir_entry in fs::read_dir(dir)? {
                let dir_entry = dir_entry?;
                let Ok(name) = dir_entry.file_name().into_string() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let relative = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                let path = dir_entry.path();
                if path.is_dir() {
                    if path.join(CONFIG_FILE_NAME).is_file() {
                        continue;
                    }
                    walk(&path, &relative, out)?;
                } else {
                    out.push(relative);
                }
            }
            Ok(())
        }
        let mut names = Vec::new();
        walk(&self.resource_dir(entry), "", &mut names)?;
        names.sort_unstable();
        Ok(names)
    }

    fn state_path(&self, entry: &ResourceEntry) -> PathBuf {
        self.resource_dir(entry).join(STATE_DIR_NAME).join("state.yaml")
    }

    fn load_state(
        &self,
        entry: &ResourceEntry,
    ) -> std::collections::BTreeMap<String, FileState> {
        fs::read_to_string(self.state_path(entry))
            .ok()
            .and_then(|text| serde_yaml::from_str(&text).ok())
            .unwrap_or_default()
    }

    fn save_state(
        &self,
        entry: &ResourceEntry,
        state: &std::collections::BTreeMap<String, FileState>,
    ) -> Result<()> {
        let path = self.state_path(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&path, serde_yaml::to_string(state)?.as_bytes())?;
        Ok(())
    }

    fn file_timestamp(path: &Path) -> Result<String> {
        let modified = fs::metadata(path)?.modified()?;
        let seconds = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(seconds.to_string())
    }

    /// Compute a fresh manifest of a resource from the files on disk.
    ///
    /// Md5 digests of files whose size and timestamp match the recorded
    /// state are reused; everything else is re-hashed.
    pub fn build_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
        let mut state = self.load_state(entry);
        let mut manifest = Manifest::new();
        for name in self.collect_filenames(entry)? {
            let path = self.file_path(entry, &name);
            let size = fs::metadata(&path)?.len();
            let timestamp = Self::file_timestamp(&path)?;
            let md5 = match state.get(&name) {
                Some(recorded)
                    if recorded.size == size && recorded.timestamp == timestamp =>
                {
                    recorded.md5.clone()
                }
                _ => {
                    debug!(resource_id = %entry.id, file = %name, "hashing file");
                    let mut file = File::open(&path)?;
                    let (_, md5) = compute_md5(&mut file)?;
                    md5
                }
            };
            state.insert(
                name.clone(),
                FileState {
                    size,
                    timestamp: timestamp.clone(),
                    md5: md5.clone(),
                },
            );
            manifest.add(ManifestEntry {
                name,
                size,
                md5,
                timestamp: Some(timestamp),
            });
        }
        state.retain(|name, _| manifest.get(name).is_some());
        self.save_state(entry, &state)?;
        Ok(manifest)
    }

    pub fn save_manifest(&self, entry: &ResourceEntry, manifest: &Manifest) -> Result<()> {
        let path = self.resource_dir(entry).join(MANIFEST_FILE_NAME);
        atomic_write(&path, manifest.to_yaml_string()?.as_bytes())?;
        Ok(())
    }

    /// Rebuild the manifest and persist it when it differs from the
    /// stored one. Returns the fresh manifest and the changed names.
    pub fn repair_manifest(
        &self,
        entry: &ResourceEntry,
    ) -> Result<(Manifest, Vec<String>)> {
        let fresh = self.build_manifest(entry)?;
        let stored = self.load_stored_manifest(entry)?;
        let changed: Vec<String> = match &stored {
            Some(stored) => fresh.diff(stored).iter().map(|s| s.to_string()).collect(),
            None => fresh.names().map(str::to_string).collect(),
        };
        if stored.as_ref() != Some(&fresh) {
            self.save_manifest(entry, &fresh)?;
        }
        Ok((fresh, changed))
    }

    fn load_stored_manifest(&self, entry: &ResourceEntry) -> Result<Option<Manifest>> {
        let path = self.resource_dir(entry).join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(Manifest::from_yaml_str(&entry.id, &text)?))
    }

    /// Store a file into a resource directory with a temp-write +
    /// rename publish; the recorded state is updated so the next
    /// manifest build need not re-hash the file.
    pub fn store_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
        reader: &mut dyn Read,
    ) -> Result<ManifestEntry> {
        let path = self.file_path(entry, filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        atomic_write(&path, &content)?;
        let (size, md5) = compute_md5(&mut std::io::Cursor::new(&content))?;
        let timestamp = Self::file_timestamp(&path)?;
        let mut state = self.load_state(entry);
        state.insert(
            filename.to_string(),
            FileState {
                size,
                timestamp: timestamp.clone(),
                md5: md5.clone(),
            },
        );
        self.save_state(entry, &state)?;
        Ok(ManifestEntry {
            name: filename.to_string(),
            size,
            md5,
            timestamp: Some(timestamp),
        })
    }

    /// Build the repository-level contents index from stored manifests.
    pub fn build_contents(&self) -> Result<Vec<ContentsEntry>> {
        let mut contents = Vec::new();
        for entry in self.resource_entries()? {
            let manifest = self.load_manifest(&entry)?;
            let config = fs::read_to_string(
                self.resource_dir(&entry).join(CONFIG_FILE_NAME),
            )?;
            contents.push(ContentsEntry {
                id: entry.id.clone(),
                version: entry.version.to_string(),
                config,
                manifest: manifest.entries().cloned().collect(),
            });
        }
        contents.sort_by(|a, b| (&a.id, &a.version).cmp(&(&b.id, &b.version)));
        Ok(contents)
    }

    pub fn save_contents(&self) -> Result<()> {
        let contents = self.build_contents()?;
        let path = self.root.join(CONTENTS_FILE_NAME);
        atomic_write(&path, serde_json::to_string_pretty(&contents)?.as_bytes())?;
        Ok(())
    }
}

impl RepositoryProtocol for DirectoryProtocol {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    fn url(&self) -> String {
        self.root.display().to_string()
    }

    fn resource_entries(&self) -> Result<Vec<ResourceEntry>> {
        let mut entries = Vec::new();
        let mut tokens = Vec::new();
        self.scan_dir(&self.root.clone(), &mut tokens, &mut entries)?;
        Ok(entries)
    }

    fn open_raw_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>> {
        let path = self.file_path(entry, filename);
        let file = File::open(&path).map_err(|_| RepositoryError::FileNotFound {
            resource_id: entry.id.clone(),
            filename: filename.to_string(),
        })?;
        Ok(Box::new(file))
    }

    fn open_seekable_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn ReadSeek>> {
        let path = self.file_path(entry, filename);
        let file = File::open(&path).map_err(|_| RepositoryError::FileNotFound {
            resource_id: entry.id.clone(),
            filename: filename.to_string(),
        })?;
        Ok(Box::new(file))
    }

    fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool> {
        Ok(self.file_path(entry, filename).is_file())
    }

    fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
        match self.load_stored_manifest(entry)? {
            Some(manifest) => Ok(manifest),
            None => self.build_manifest(entry),
        }
    }

    fn local_file_path(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Option<PathBuf>> {
        let path = self.file_path(entry, filename);
        Ok(path.is_file().then_some(path))
    }
}

/// Write a file with a temp-write + rename publish so that readers
/// never observe a partially written file.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn demo_repo() -> (TempDir, DirectoryProtocol) {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "hg38/scores(1.0)/genomic_resource.yaml",
            b"type: position_score\n",
        );
        write_file(tmp.path(), "hg38/scores(1.0)/data.txt", b"1\t10\t0.5\n");
        write_file(
            tmp.path(),
            "hg38/genome/genomic_resource.yaml",
            b"type: genome\n",
        );
        let proto = DirectoryProtocol::new("demo", tmp.path());
        (tmp, proto)
    }

    #[test]
    fn test_scan_finds_resources() {
        let (_tmp, proto) = demo_repo();
        let mut entries = proto.resource_entries().unwrap();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<String> = entries.iter().map(|e| e.full_id()).collect();
        assert_eq!(ids, vec!["hg38/genome", "hg38/scores(1.0)"]);
    }

    #[test]
    fn test_build_and_repair_manifest() {
        let (tmp, proto) = demo_repo();
        let entry = proto
            .resource_entries()
            .unwrap()
            .into_iter()
            .find(|e| e.id == "hg38/scores")
            .unwrap();

        let (manifest, changed) = proto.repair_manifest(&entry).unwrap();
        assert_eq!(changed.len(), 2);
        assert!(manifest.get("data.txt").is_some());
        assert!(manifest.get("genomic_resource.yaml").is_some());

        // unchanged repo: repair is a no-op
        let (_, changed) = proto.repair_manifest(&entry).unwrap();
        assert!(changed.is_empty());

        // content change is detected through the md5 even if the
        // timestamp stays put
        let data = tmp.path().join("hg38/scores(1.0)/data.txt");
        fs::write(&data, b"1\t10\t0.9\n").unwrap();
        let state_path = proto.state_path(&entry);
        fs::remove_file(state_path).unwrap();
        let (_, changed) = proto.repair_manifest(&entry).unwrap();
        assert_eq!(changed, vec!["data.txt"]);
    }

    #[test]
    fn test_manifest_excludes_dotfiles_and_state() {
        let (_tmp, proto) = demo_repo();
        let entry = proto
            .resource_entries()
            .unwrap()
            .into_iter()
            .find(|e| e.id == "hg38/scores")
            .unwrap();
        proto.repair_manifest(&entry).unwrap();
        let manifest = proto.build_manifest(&entry).unwrap();
        let names: Vec<&str> = manifest.names().collect();
        assert_eq!(names, vec!["data.txt", "genomic_resource.yaml"]);
    }

    #[test]
    fn test_store_file_and_contents() {
        let (tmp, proto) = demo_repo();
        let entry = proto
            .resource_entries()
            .unwrap()
            .into_iter()
            .find(|e| e.id == "hg38/genome")
            .unwrap();
        let stored = proto
            .store_file(
                &entry,
                "chrAll.fa",
                &mut std::io::Cursor::new(b">1\nACGT\n".to_vec()),
            )
            .unwrap();
        assert_eq!(stored.size, 8);

        for entry in proto.resource_entries().unwrap() {
            proto.repair_manifest(&entry).unwrap();
        }
        proto.save_contents().unwrap();
        let text = fs::read_to_string(tmp.path().join(CONTENTS_FILE_NAME)).unwrap();
        let contents: Vec<ContentsEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].id, "hg38/genome");
        assert!(
            contents[0]
                .manifest
                .iter()
                .any(|m| m.name == "chrAll.fa")
        );
    }
}
