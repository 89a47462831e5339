//! HTTP repository backend.
//!
//! Enumerates resources from the repository-level `.CONTENTS.json`
//! index, so a remote repository needs nothing beyond a plain static
//! file server. Random access uses HTTP range requests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tracing::debug;

use crate::config::ResourceConfig;
use crate::error::{RepositoryError, Result};
use crate::manifest::{CONTENTS_FILE_NAME, ContentsEntry, Manifest};
use crate::protocol::{ReadSeek, ResourceEntry, RepositoryProtocol};
use crate::version::{ResourceVersion, versioned_id};

const RANGE_BLOCK_SIZE: u64 = 256 * 1024;

pub struct HttpProtocol {
    repo_id: String,
    base_url: String,
    entries: Vec<ResourceEntry>,
    manifests: HashMap<String, Manifest>,
}

impl HttpProtocol {
    /// Connect to a remote repository and load its contents index.
    pub fn new(repo_id: &str, base_url: &str) -> Result<HttpProtocol> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = format!("{}/{}", base_url, CONTENTS_FILE_NAME);
        let content = http_get(&url)?;
        let contents: Vec<ContentsEntry> = serde_json::from_slice(&content)?;

        let mut entries = Vec::with_capacity(contents.len());
        let mut manifests = HashMap::with_capacity(contents.len());
        for item in contents {
            let version = ResourceVersion::parse(&item.version)?;
            let config = ResourceConfig::from_yaml_str(&item.id, &item.config)?;
            let entry = ResourceEntry {
                id: item.id,
                version,
                config,
            };
            manifests.insert(entry.full_id(), Manifest::from_entries(item.manifest));
            entries.push(entry);
        }
        debug!(repo_id, base_url, resources = entries.len(), "loaded contents index");
        Ok(HttpProtocol {
            repo_id: repo_id.to_string(),
            base_url,
            entries,
            manifests,
        })
    }

    fn file_url(&self, entry: &ResourceEntry, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            versioned_id(&entry.id, &entry.version),
            filename
        )
    }
}

impl RepositoryProtocol for HttpProtocol {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    fn url(&self) -> String {
        self.base_url.clone()
    }

    fn resource_entries(&self) -> Result<Vec<ResourceEntry>> {
        Ok(self.entries.clone())
    }

    fn open_raw_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>> {
        let content = http_get(&self.file_url(entry, filename))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn open_seekable_file(
        &self,
        entry: &ResourceEntry,
        filename: &str,
    ) -> Result<Box<dyn ReadSeek>> {
        let url = self.file_url(entry, filename);
        let size = match self.load_manifest(entry)?.get(filename) {
            Some(manifest_entry) => manifest_entry.size,
            None => {
                return Err(RepositoryError::FileNotFound {
                    resource_id: entry.id.clone(),
                    filename: filename.to_string(),
                });
            }
        };
        Ok(Box::new(HttpRangeReader::new(url, size)))
    }

    fn file_exists(&self, entry: &ResourceEntry, filename: &str) -> Result<bool> {
        Ok(self.load_manifest(entry)?.get(filename).is_some())
    }

    fn load_manifest(&self, entry: &ResourceEntry) -> Result<Manifest> {
        self.manifests
            .get(&entry.full_id())
            .cloned()
            .ok_or_else(|| RepositoryError::ResourceNotFound {
                resource_id: entry.id.clone(),
                constraint: None,
            })
    }
}

fn http_get(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .map_err(|err| RepositoryError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    let mut content = Vec::new();
    response
        .into_body()
        .into_reader()
        .read_to_end(&mut content)
        .map_err(|err| RepositoryError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    Ok(content)
}

fn http_get_range(url: &str, start: u64, end_inclusive: u64) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .header("Range", &format!("bytes={}-{}", start, end_inclusive))
        .call()
        .map_err(|err| RepositoryError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    let mut content = Vec::new();
    response
        .into_body()
        .into_reader()
        .read_to_end(&mut content)
        .map_err(|err| RepositoryError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    Ok(content)
}

/// Random access over a remote file through HTTP range requests.
///
/// Reads are served from a block buffer so that the short scattered
/// reads of index-driven consumers do not become one request each.
pub struct HttpRangeReader {
    url: String,
    size: u64,
    position: u64,
    block_start: u64,
    block: Vec<u8>,
}

impl HttpRangeReader {
    pub fn new(url: String, size: u64) -> HttpRangeReader {
        HttpRangeReader {
            url,
            size,
            position: 0,
            block_start: 0,
            block: Vec::new(),
        }
    }

    fn ensure_block(&mut self) -> io::Result<()> {
        let in_block = self.position >= self.block_start
            && self.position < self.block_start + self.block.len() as u64;
        if in_block {
            return Ok(());
        }
        let start = self.position;
        let end_inclusive = (start + RANGE_BLOCK_SIZE - 1).min(self.size - 1);
        let block = http_get_range(&self.url, start, end_inclusive)
            .map_err(io::Error::other)?;
        self.block_start = start;
        self.block = block;
        Ok(())
    }
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.size || buf.is_empty() {
            return Ok(0);
        }
        self.ensure_block()?;
        let offset = (self.position - self.block_start) as usize;
        if offset >= self.block.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.block.len() - offset);
        buf[..n].copy_from_slice(&self.block[offset..offset + n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => self.size as i128 + offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of remote file",
            ));
        }
        self.position = target as u64;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_range_reader_seek_arithmetic() {
        let mut reader = HttpRangeReader::new("http://example/file".to_string(), 100);
        assert_eq!(reader.seek(SeekFrom::Start(10)).unwrap(), 10);
        assert_eq!(reader.seek(SeekFrom::Current(5)).unwrap(), 15);
        assert_eq!(reader.seek(SeekFrom::End(-10)).unwrap(), 90);
        assert!(reader.seek(SeekFrom::Current(-200)).is_err());
    }

    #[test]
    fn test_range_reader_read_at_end() {
        let mut reader = HttpRangeReader::new("http://example/file".to_string(), 10);
        reader.seek(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
