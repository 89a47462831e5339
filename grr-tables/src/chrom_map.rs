//! Chromosome name mapping between a table file and the reference
//! genome namespace.
//!
//! A table whose file uses `1..22,X,Y` can be presented under
//! `chr1..chr22,chrX,chrY` with `add_prefix: chr` (and the other way
//! around with `del_prefix`), or through an explicit two-column
//! mapping file `chrom<TAB>file_chrom`.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use crate::config::ChromMappingConfig;
use crate::error::{Result, TableError};

const AUTO_PREFIX: &str = "chr";

#[derive(Debug, Clone, Default)]
pub enum ChromMap {
    #[default]
    Identity,
    /// Query names carry a prefix the file names lack.
    AddPrefix(String),
    /// File names carry a prefix the query names lack.
    DelPrefix(String),
    /// Detected at open time from the file's first chromosome: queries
    /// in either the bare or the `chr`-prefixed namespace are accepted
    /// and rows keep the file's spelling.
    Auto { file_prefixed: bool },
    Table {
        to_file: HashMap<String, String>,
        from_file: HashMap<String, String>,
    },
}

impl ChromMap {
    /// Build the mapping for a table without an explicit
    /// `chrom_mapping` by sampling the file's first chromosome.
    pub fn auto_detect(first_file_chrom: Option<&str>) -> ChromMap {
        match first_file_chrom {
            Some(chrom) => ChromMap::Auto {
                file_prefixed: chrom.starts_with(AUTO_PREFIX),
            },
            None => ChromMap::Identity,
        }
    }
    pub fn from_config(
        resource_id: &str,
        config: Option<&ChromMappingConfig>,
        mapping_file: Option<Box<dyn Read>>,
    ) -> Result<ChromMap> {
        let Some(config) = config else {
            return Ok(ChromMap::Identity);
        };
        match (&config.add_prefix, &config.del_prefix, &config.filename) {
            (Some(prefix), None, None) => Ok(ChromMap::AddPrefix(prefix.clone())),
            (None, Some(prefix), None) => Ok(ChromMap::DelPrefix(prefix.clone())),
            (None, None, Some(_)) => {
                let Some(reader) = mapping_file else {
                    return Err(TableError::Config {
                        resource_id: resource_id.to_string(),
                        message: "chrom mapping file not provided".to_string(),
                    });
                };
                Self::from_mapping_file(resource_id, reader)
            }
            (None, None, None) => Ok(ChromMap::Identity),
            _ => Err(TableError::Config {
                resource_id: resource_id.to_string(),
                message: "chrom_mapping accepts exactly one of \
                          add_prefix, del_prefix or filename"
                    .to_string(),
            }),
        }
    }

    fn from_mapping_file(resource_id: &str, reader: Box<dyn Read>) -> Result<ChromMap> {
        let mut to_file = HashMap::new();
        let mut from_file = HashMap::new();
        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line == "chrom\tfile_chrom" {
                continue;
            }
            let mut parts = line.split('\t');
            let (Some(chrom), Some(file_chrom), None) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(TableError::Config {
                    resource_id: resource_id.to_string(),
                    message: format!(
                        "bad chrom mapping line {}: <{}>",
                        number + 1,
                        line
                    ),
                });
            };
            to_file.insert(chrom.to_string(), file_chrom.to_string());
            from_file.insert(file_chrom.to_string(), chrom.to_string());
        }
        Ok(ChromMap::Table { to_file, from_file })
    }

    /// Map a query chromosome to the file namespace; `None` when the
    /// mapping excludes it.
    pub fn to_file(&self, chrom: &str) -> Option<String> {
        match self {
            ChromMap::Identity => Some(chrom.to_string()),
            ChromMap::AddPrefix(prefix) => {
                chrom.strip_prefix(prefix.as_str()).map(str::to_string)
            }
            ChromMap::DelPrefix(prefix) => Some(format!("{}{}", prefix, chrom)),
            ChromMap::Auto { file_prefixed } => {
                if *file_prefixed == chrom.starts_with(AUTO_PREFIX) {
                    Some(chrom.to_string())
                } else if *file_prefixed {
                    Some(format!("{}{}", AUTO_PREFIX, chrom))
                } else {
                    chrom.strip_prefix(AUTO_PREFIX).map(str::to_string)
                }
            }
            ChromMap::Table { to_file, .. } => to_file.get(chrom).cloned(),
        }
    }

    /// Map a file chromosome to the query namespace; `None` when the
    /// mapping excludes it.
    pub fn from_file(&self, file_chrom: &str) -> Option<String> {
        match self {
            ChromMap::Identity => Some(file_chrom.to_string()),
            ChromMap::AddPrefix(prefix) => Some(format!("{}{}", prefix, file_chrom)),
            ChromMap::DelPrefix(prefix) => file_chrom
                .strip_prefix(prefix.as_str())
                .map(str::to_string),
            ChromMap::Auto { .. } => Some(file_chrom.to_string()),
            ChromMap::Table { from_file, .. } => from_file.get(file_chrom).cloned(),
        }
    }
}
