//! Liftover chain resource: UCSC chain files mapping positions
//! between genome assemblies.

use std::io::{BufRead, BufReader};

use serde::{Deserialize, Serialize};

use grr_repository::Resource;

use crate::error::{ResourceError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftoverConfig {
    pub filename: String,
}

/// One aligned block: a half-open target range and the chain-local
/// query offset it maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChainBlock {
    t_start: u64,
    t_end: u64,
    q_start: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct Chain {
    score: u64,
    t_name: String,
    t_start: u64,
    t_end: u64,
    q_name: String,
    q_size: u64,
    q_reverse: bool,
    blocks: Vec<ChainBlock>,
}

/// A lifted coordinate, closed 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftedPosition {
    pub chrom: String,
    pub pos: u64,
    pub reverse_strand: bool,
}

pub struct LiftoverChain {
    resource_id: String,
    chains: Vec<Chain>,
}

impl LiftoverChain {
    pub fn open(resource: &Resource) -> Result<LiftoverChain> {
        let config: LiftoverConfig = resource
            .config()
            .deserialize(resource.id())
            .map_err(|err| ResourceError::Config {
                resource_id: resource.id().to_string(),
                message: err.to_string(),
            })?;

        let reader = resource.open_raw_file(&config.filename, true)?;
        let mut chains =
            Self::parse_chains(resource.id(), &config.filename, BufReader::new(reader))?;
        // highest-scoring chain wins when alignments overlap
        chains.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(LiftoverChain {
            resource_id: resource.id().to_string(),
            chains,
        })
    }

    fn parse_chains(
        resource_id: &str,
        filename: &str,
        reader: impl BufRead,
    ) -> Result<Vec<Chain>> {
        let parse_error = |line_number: usize, message: &str| ResourceError::Parse {
            resource_id: resource_id.to_string(),
            filename: filename.to_string(),
            message: format!("line {}: {}", line_number + 1, message),
        };

        let mut chains = Vec::new();
        let mut current: Option<Chain> = None;
        let mut t_cursor = 0u64;
        let mut q_cursor = 0u64;

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_ascii_whitespace().collect();
            if fields[0] == "chain" {
                if let Some(chain) = current.take() {
                    chains.push(chain);
                }
                if fields.len() < 12 {
                    return Err(parse_error(number, "short chain header"));
                }
                let number_at = |index: usize| -> Result<u64> {
                    fields[index]
                        .parse()
                        .map_err(|_| parse_error(number, "bad chain header field"))
                };
                if fields[4] != "+" {
                    return Err(parse_error(number, "target strand must be +"));
                }
                let q_reverse = match fields[9] {
                    "+" => false,
                    "-" => true,
                    _ => return Err(parse_error(number, "bad query strand")),
                };
                t_cursor = number_at(5)?;
                q_cursor = number_at(10)?;
                current = Some(Chain {
                    score: number_at(1)?,
                    t_name: fields[2].to_string(),
                    t_start: t_cursor,
                    t_end: number_at(6)?,
                    q_name: fields[7].to_string(),
                    q_size: number_at(8)?,
                    q_reverse,
                    blocks: Vec::new(),
                });
            } else {
                let chain = current
                    .as_mut()
                    .ok_or_else(|| parse_error(number, "alignment block before chain header"))?;
                if fields.len() != 1 && fields.len() != 3 {
                    return Err(parse_error(number, "bad alignment block"));
                }
                let number_at = |index: usize| -> Result<u64> {
                    fields[index]
                        .parse()
                        .map_err(|_| parse_error(number, "bad alignment block"))
                };
                let size = number_at(0)?;
                chain.blocks.push(ChainBlock {
                    t_start: t_cursor,
                    t_end: t_cursor + size,
                    q_start: q_cursor,
                });
                if fields.len() == 3 {
                    t_cursor += size + number_at(1)?;
                    q_cursor += size + number_at(2)?;
                } else {
                    // single-field line closes the chain
                    chains.push(current.take().unwrap());
                }
            }
        }
        if let Some(chain) = current.take() {
            chains.push(chain);
        }
        Ok(chains)
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Map a closed 1-based position to the query assembly. Positions
    /// falling into an alignment gap are not mappable.
    pub fn map_position(&self, chrom: &str, pos: u64) -> Option<LiftedPosition> {
        if pos == 0 {
            return None;
        }
        let pos0 = pos - 1;
        for chain in &self.chains {
            if chain.t_name != chrom || pos0 < chain.t_start || pos0 >= chain.t_end {
                continue;
            }
            for block in &chain.blocks {
                if block.t_start <= pos0 && pos0 < block.t_end {
                    let q_pos = block.q_start + (pos0 - block.t_start);
                    let q_pos = if chain.q_reverse {
                        chain.q_size - 1 - q_pos
                    } else {
                        q_pos
                    };
                    return Some(LiftedPosition {
                        chrom: chain.q_name.clone(),
                        pos: q_pos + 1,
                        reverse_strand: chain.q_reverse,
                    });
                }
            }
        }
        None
    }
}
