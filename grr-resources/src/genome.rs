//! Reference genome resource: FASTA plus `.fai` index.
//!
//! Sequence fetches use `.fai` arithmetic over a seekable reader, so
//! remote genomes are read by range without downloading whole
//! chromosomes.

use std::io::{Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};

use grr_repository::{ReadSeek, Resource};

use crate::error::{ResourceError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeConfig {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pars: Option<ParsConfig>,
}

/// Pseudoautosomal regions of the sex chromosomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsConfig {
    #[serde(default)]
    pub x: Vec<RegionSpec>,
    #[serde(default)]
    pub y: Vec<RegionSpec>,
}

/// `chrom:begin-end` region, closed 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionSpec {
    pub chrom: String,
    pub begin: u64,
    pub end: u64,
}

impl TryFrom<String> for RegionSpec {
    type Error = String;

    fn try_from(text: String) -> std::result::Result<RegionSpec, String> {
        let (chrom, range) = text
            .split_once(':')
            .ok_or_else(|| format!("bad region: <{}>", text))?;
        let (begin, end) = range
            .split_once('-')
            .ok_or_else(|| format!("bad region: <{}>", text))?;
        let begin: u64 = begin
            .replace(',', "")
            .parse()
            .map_err(|_| format!("bad region: <{}>", text))?;
        let end: u64 = end
            .replace(',', "")
            .parse()
            .map_err(|_| format!("bad region: <{}>", text))?;
        if begin == 0 || end < begin {
            return Err(format!("bad region: <{}>", text));
        }
        Ok(RegionSpec {
            chrom: chrom.to_string(),
            begin,
            end,
        })
    }
}

impl From<RegionSpec> for String {
    fn from(region: RegionSpec) -> String {
        format!("{}:{}-{}", region.chrom, region.begin, region.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FaiRecord {
    name: String,
    length: u64,
    offset: u64,
    line_bases: u64,
    line_width: u64,
}

pub struct ReferenceGenome {
    resource_id: String,
    config: GenomeConfig,
    index: Vec<FaiRecord>,
    reader: Box<dyn ReadSeek>,
}

impl ReferenceGenome {
    pub fn open(resource: &Resource) -> Result<ReferenceGenome> {
        let config: GenomeConfig = resource
            .config()
            .deserialize(resource.id())
            .map_err(|err| ResourceError::Config {
                resource_id: resource.id().to_string(),
                message: err.to_string(),
            })?;

        let index_filename = format!("{}.fai", config.filename);
        let index_text = resource.file_string(&index_filename)?;
        let mut index = Vec::new();
        for (number, line) in index_text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let parse_error = || ResourceError::Parse {
                resource_id: resource.id().to_string(),
                filename: index_filename.clone(),
                message: format!("bad fai line {}", number + 1),
            };
            if fields.len() < 5 {
                return Err(parse_error());
            }
            index.push(FaiRecord {
                name: fields[0].to_string(),
                length: fields[1].parse().map_err(|_| parse_error())?,
                offset: fields[2].parse().map_err(|_| parse_error())?,
                line_bases: fields[3].parse().map_err(|_| parse_error())?,
                line_width: fields[4].parse().map_err(|_| parse_error())?,
            });
        }

        let reader = resource.open_seekable_file(&config.filename)?;
        Ok(ReferenceGenome {
            resource_id: resource.id().to_string(),
            config,
            index,
            reader,
        })
    }

    pub fn chromosomes(&self) -> Vec<String> {
        self.index.iter().map(|r| r.name.clone()).collect()
    }

    pub fn chromosome_length(&self, chrom: &str) -> Result<u64> {
        self.record(chrom).map(|r| r.length)
    }

    fn record(&self, chrom: &str) -> Result<&FaiRecord> {
        self.index
            .iter()
            .find(|r| r.name == chrom)
            .ok_or_else(|| ResourceError::UnknownChromosome {
                resource_id: self.resource_id.clone(),
                chrom: chrom.to_string(),
            })
    }

    /// Sequence of the closed 1-based interval `[begin, end]`,
    /// uppercased.
    pub fn fetch_sequence(&mut self, chrom: &str, begin: u64, end: u64) -> Result<String> {
        let record = self.record(chrom)?.clone();
        if begin == 0 || end < begin || end > record.length {
            return Err(ResourceError::PositionOutOfBounds {
                resource_id: self.resource_id.clone(),
                chrom: chrom.to_string(),
                pos: if begin == 0 || end < begin { begin } else { end },
            });
        }
        let start0 = begin - 1;
        let file_offset = record.offset
            + (start0 / record.line_bases) * record.line_width
            + start0 % record.line_bases;
        self.reader.seek(SeekFrom::Start(file_offset))?;

        let wanted = (end - begin + 1) as usize;
        let mut sequence = String::with_capacity(wanted);
        let mut buffer = [0u8; 8192];
        while sequence.len() < wanted {
            let n = self.reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            for &byte in &buffer[..n] {
                if byte == b'\n' || byte == b'\r' {
                    continue;
                }
                sequence.push(byte.to_ascii_uppercase() as char);
                if sequence.len() == wanted {
                    break;
                }
            }
        }
        Ok(sequence)
    }

    /// Is a position inside a configured pseudoautosomal region?
    pub fn is_pseudoautosomal(&self, chrom: &str, pos: u64) -> bool {
        let Some(pars) = &self.config.pars else {
            return false;
        };
        pars.x
            .iter()
            .chain(pars.y.iter())
            .any(|region| region.chrom == chrom && region.begin <= pos && pos <= region.end)
    }
}
