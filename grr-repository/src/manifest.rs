//! Resource manifests and the repository contents index.
//!
//! Every resource carries a `.MANIFEST` file: a YAML list of the
//! resource's files with their sizes and md5 digests. The md5 digest is
//! the authoritative freshness signal; timestamps are advisory only and
//! merely let local backends skip recomputing digests of unchanged
//! files.

use std::collections::BTreeMap;
use std::io::Read;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};

/// File name of the per-resource configuration.
pub const CONFIG_FILE_NAME: &str = "genomic_resource.yaml";
/// File name of the per-resource manifest.
pub const MANIFEST_FILE_NAME: &str = ".MANIFEST";
/// File name of the repository-level contents index.
pub const CONTENTS_FILE_NAME: &str = ".CONTENTS.json";

/// One file of a resource as recorded in its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
    pub md5: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// The manifest of a single resource, keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Manifest {
        Manifest::default()
    }

    pub fn from_entries(entries: Vec<ManifestEntry>) -> Manifest {
        Manifest {
            entries: entries
                .into_iter()
                .map(|entry| (entry.name.clone(), entry))
                .collect(),
        }
    }

    pub fn from_yaml_str(resource_id: &str, text: &str) -> Result<Manifest> {
        let entries: Vec<ManifestEntry> = serde_yaml::from_str(text).map_err(|err| {
            RepositoryError::ManifestParse {
                resource_id: resource_id.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(Manifest::from_entries(entries))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let entries: Vec<&ManifestEntry> = self.entries.values().collect();
        Ok(serde_yaml::to_string(&entries)?)
    }

    pub fn add(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File names in `self` whose size or md5 differ from `other`,
    /// plus names present on only one side.
    pub fn diff<'a>(&'a self, other: &'a Manifest) -> Vec<&'a str> {
        let mut changed: Vec<&str> = Vec::new();
        for (name, entry) in &self.entries {
            match other.entries.get(name) {
                Some(other_entry)
                    if other_entry.size == entry.size && other_entry.md5 == entry.md5 => {}
                _ => changed.push(name),
            }
        }
        for name in other.entries.keys() {
            if !self.entries.contains_key(name) {
                changed.push(name);
            }
        }
        changed.sort_unstable();
        changed
    }
}

/// One resource in the repository-level `.CONTENTS.json` index.
///
/// The index lets remote clients enumerate a repository and read every
/// resource configuration and manifest with a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentsEntry {
    pub id: String,
    pub version: String,
    pub config: String,
    pub manifest: Vec<ManifestEntry>,
}

/// Stream `reader` to the end and return `(size, md5-hex)`.
pub fn compute_md5(reader: &mut dyn Read) -> Result<(u64, String)> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }
    Ok((size, format!("{:x}", hasher.finalize())))
}
