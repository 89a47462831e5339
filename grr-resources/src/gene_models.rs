//! Gene models resource: refFlat-style transcript tables.
//!
//! RefFlat rows are `geneName name chrom strand txStart txEnd cdsStart
//! cdsEnd exonCount exonStarts exonEnds` with 0-based half-open
//! coordinates; they are converted to closed 1-based intervals on
//! load.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};

use serde::{Deserialize, Serialize};

use grr_repository::Resource;

use crate::error::{ResourceError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneModelsConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

/// Closed 1-based interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub begin: u64,
    pub end: u64,
}

impl Span {
    pub fn contains(&self, pos: u64) -> bool {
        self.begin <= pos && pos <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub gene: String,
    pub transcript_id: String,
    pub chrom: String,
    pub strand: Strand,
    pub tx: Span,
    pub cds: Option<Span>,
    pub exons: Vec<Span>,
}

impl Transcript {
    pub fn is_coding(&self) -> bool {
        self.cds.is_some()
    }
}

pub struct GeneModels {
    resource_id: String,
    transcripts: Vec<Transcript>,
    by_gene: HashMap<String, Vec<usize>>,
}

impl GeneModels {
    pub fn open(resource: &Resource) -> Result<GeneModels> {
        let config: GeneModelsConfig = resource
            .config()
            .deserialize(resource.id())
            .map_err(|err| ResourceError::Config {
                resource_id: resource.id().to_string(),
                message: err.to_string(),
            })?;

        let reader = resource.open_raw_file(&config.filename, true)?;
        let mut transcripts = Vec::new();
        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            transcripts.push(Self::parse_refflat_line(
                resource.id(),
                &config.filename,
                number as u64 + 1,
                &line,
            )?);
        }

        let mut by_gene: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, transcript) in transcripts.iter().enumerate() {
            by_gene
                .entry(transcript.gene.clone())
                .or_default()
                .push(index);
        }

        Ok(GeneModels {
            resource_id: resource.id().to_string(),
            transcripts,
            by_gene,
        })
    }

    fn parse_refflat_line(
        resource_id: &str,
        filename: &str,
        line_number: u64,
        line: &str,
    ) -> Result<Transcript> {
        let parse_error = |message: &str| ResourceError::Parse {
            resource_id: resource_id.to_string(),
            filename: filename.to_string(),
            message: format!("line {}: {}", line_number, message),
        };
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(parse_error("expected 11 refFlat columns"));
        }
        let number = |text: &str| -> Result<u64> {
            text.parse().map_err(|_| parse_error("bad coordinate"))
        };

        let strand = match fields[3] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => return Err(parse_error("bad strand")),
        };
        let tx_start = number(fields[4])?;
        let tx_end = number(fields[5])?;
        let cds_start = number(fields[6])?;
        let cds_end = number(fields[7])?;
        let exon_count: usize = fields[8]
            .parse()
            .map_err(|_| parse_error("bad exon count"))?;

        let parse_offsets = |text: &str| -> Result<Vec<u64>> {
            text.trim_end_matches(',')
                .split(',')
                .map(|part| number(part))
                .collect()
        };
        let exon_starts = parse_offsets(fields[9])?;
        let exon_ends = parse_offsets(fields[10])?;
        if exon_starts.len() != exon_count || exon_ends.len() != exon_count {
            return Err(parse_error("exon list does not match exon count"));
        }
        let exons = exon_starts
            .iter()
            .zip(&exon_ends)
            .map(|(&start, &end)| Span {
                begin: start + 1,
                end,
            })
            .collect();

        Ok(Transcript {
            gene: fields[0].to_string(),
            transcript_id: fields[1].to_string(),
            chrom: fields[2].to_string(),
            strand,
            tx: Span {
                begin: tx_start + 1,
                end: tx_end,
            },
            // cdsStart == cdsEnd marks a non-coding transcript
            cds: (cds_start < cds_end).then_some(Span {
                begin: cds_start + 1,
                end: cds_end,
            }),
            exons,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn gene_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_gene.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn transcripts_of_gene(&self, gene: &str) -> Vec<&Transcript> {
        self.by_gene
            .get(gene)
            .map(|indices| indices.iter().map(|&i| &self.transcripts[i]).collect())
            .unwrap_or_default()
    }

    /// Transcripts whose span contains a position.
    pub fn transcripts_at(&self, chrom: &str, pos: u64) -> Vec<&Transcript> {
        self.transcripts
            .iter()
            .filter(|t| t.chrom == chrom && t.tx.contains(pos))
            .collect()
    }

    /// Gene names at a position, deduplicated.
    pub fn genes_at(&self, chrom: &str, pos: u64) -> Vec<&str> {
        let mut genes: Vec<&str> = self
            .transcripts_at(chrom, pos)
            .iter()
            .map(|t| t.gene.as_str())
            .collect();
        genes.sort_unstable();
        genes.dedup();
        genes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use grr_repository::build_inmemory_repository;

    const CONFIG: &str = "type: gene_models\nfilename: genes.txt\n";

    const REFFLAT: &str = "\
BRCA2\tNM_000059\t13\t+\t32315473\t32400266\t32316460\t32398770\t3\t32315473,32316421,32319076,\t32315667,32316527,32319325,
TP53\tNM_000546\t17\t-\t7668401\t7687549\t7669608\t7687489\t2\t7668401,7675993,\t7669690,7676272,
TP53\tNM_001126112\t17\t-\t7668401\t7687549\t7668401\t7668401\t1\t7668401,\t7669690,
";

    fn gene_models() -> GeneModels {
        let mut files = BTreeMap::new();
        files.insert(
            "genes/genomic_resource.yaml".to_string(),
            CONFIG.as_bytes().to_vec(),
        );
        files.insert("genes/genes.txt".to_string(), REFFLAT.as_bytes().to_vec());
        let resource = build_inmemory_repository("demo", files)
            .get_resource("genes", None)
            .unwrap();
        GeneModels::open(&resource).unwrap()
    }

    #[test]
    fn test_load_and_lookup_by_gene() {
        let models = gene_models();
        assert_eq!(models.gene_names(), vec!["BRCA2", "TP53"]);
        assert_eq!(models.transcripts_of_gene("TP53").len(), 2);
        assert!(models.transcripts_of_gene("EGFR").is_empty());
    }

    #[test]
    fn test_coordinate_conversion() {
        let models = gene_models();
        let brca2 = &models.transcripts_of_gene("BRCA2")[0];
        assert_eq!(brca2.tx, Span { begin: 32315474, end: 32400266 });
        assert_eq!(brca2.exons.len(), 3);
        assert_eq!(brca2.exons[0], Span { begin: 32315474, end: 32315667 });
        assert!(brca2.is_coding());
    }

    #[test]
    fn test_non_coding_transcript() {
        let models = gene_models();
        let noncoding = models
            .transcripts()
            .iter()
            .find(|t| t.transcript_id == "NM_001126112")
            .unwrap();
        assert!(!noncoding.is_coding());
    }

    #[test]
    fn test_position_lookup() {
        let models = gene_models();
        assert_eq!(models.genes_at("17", 7670000), vec!["TP53"]);
        assert!(models.genes_at("17", 1).is_empty());
        assert!(models.genes_at("13", 7670000).is_empty());
    }
}
