//! VCF INFO scores: a VCF-layout table whose scores are INFO keys.
//!
//! The table carries the standard `CHROM POS ID REF ALT QUAL FILTER
//! INFO` columns; multi-allelic rows list alternatives comma-separated
//! and per-allele INFO values (VCF `Number=A`) are picked by allele
//! index. "Allele not in the table" (`None` result) is distinct from
//! "allele present with a missing value" (`Some` with `None` slots).

use grr_core::AttributeValue;
use grr_repository::Resource;
use grr_tables::{Line, PositionTable, open_table};

use crate::config::{ScoreConfig, ScoreDef};
use crate::error::{Result, ScoreError};

pub struct VcfInfoScore {
    resource_id: String,
    scores: Vec<ScoreDef>,
    table: Box<dyn PositionTable>,
    info_column: usize,
}

impl VcfInfoScore {
    pub fn open(resource: &Resource) -> Result<VcfInfoScore> {
        let config: ScoreConfig = resource.config().deserialize(resource.id())?;
        Self::open_with_config(resource, config)
    }

    fn open_with_config(resource: &Resource, config: ScoreConfig) -> Result<VcfInfoScore> {
        // VCF special columns resolve by their standard header names
        let table = open_table(resource, &config.table)?;
        let info_column =
            table
                .schema()
                .column_index("INFO")
                .ok_or_else(|| ScoreError::Config {
                    resource_id: resource.id().to_string(),
                    message: "vcf_info table has no INFO column".to_string(),
                })?;
        Ok(VcfInfoScore {
            resource_id: resource.id().to_string(),
            scores: config.scores,
            table,
            info_column,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn score_ids(&self) -> Vec<&str> {
        self.scores.iter().map(|def| def.id.as_str()).collect()
    }

    pub fn score_def(&self, score_id: &str) -> Result<&ScoreDef> {
        self.scores
            .iter()
            .find(|def| def.id == score_id)
            .ok_or_else(|| ScoreError::UnknownScore {
                resource_id: self.resource_id.clone(),
                score_id: score_id.to_string(),
            })
    }

    pub fn chromosomes(&self) -> Vec<String> {
        self.table.chromosomes()
    }

    /// INFO-derived values for one allele; `None` when no row carries
    /// the allele.
    pub fn fetch_scores(
        &mut self,
        chrom: &str,
        pos: u64,
        reference: &str,
        alternative: &str,
        score_ids: Option<&[&str]>,
    ) -> Result<Option<Vec<Option<AttributeValue>>>> {
        let selection: Vec<&ScoreDef> = match score_ids {
            None => self.scores.iter().collect(),
            Some(ids) => {
                let mut selection = Vec::with_capacity(ids.len());
                for id in ids {
                    selection.push(
                        self.scores
                            .iter()
                            .find(|def| def.id == *id)
                            .ok_or_else(|| ScoreError::UnknownScore {
                                resource_id: self.resource_id.clone(),
                                score_id: id.to_string(),
                            })?,
                    );
                }
                selection
            }
        };

        let lines = self.table.fetch(chrom, Some(pos), Some(pos))?;
        for line in &lines {
            if line.pos_begin != pos || line.reference.as_deref() != Some(reference) {
                continue;
            }
            let Some(alt_field) = line.alternative.as_deref() else {
                continue;
            };
            let alternatives: Vec<&str> = alt_field.split(',').collect();
            let Some(allele_index) =
                alternatives.iter().position(|alt| *alt == alternative)
            else {
                continue;
            };
            let values = selection
                .iter()
                .map(|def| {
                    self.info_value(line, def, allele_index, alternatives.len())
                })
                .collect();
            return Ok(Some(values));
        }
        Ok(None)
    }

    fn info_value(
        &self,
        line: &Line,
        def: &ScoreDef,
        allele_index: usize,
        allele_count: usize,
    ) -> Option<AttributeValue> {
        let info = line.get(self.info_column)?;
        for item in info.split(';') {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (item, None),
            };
            if key != def.id {
                continue;
            }
            let Some(value) = value else {
                // flag entry, present means true
                return Some(AttributeValue::Int(1));
            };
            let parts: Vec<&str> = value.split(',').collect();
            let text = if parts.len() == allele_count {
                parts[allele_index]
            } else {
                value
            };
            return def.parse_value(text);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use grr_repository::build_inmemory_repository;

    const CONFIG: &str = r"
type: vcf_info
table:
  filename: data.vcf
scores:
- id: AF
  type: float
- id: DB
  type: int
";

    const VCF: &str = "\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t10\t.\tA\tC,T\t50\tPASS\tAF=0.01,0.20;DB
1\t15\t.\tG\tGA\t99\tPASS\tAF=0.50
2\t5\t.\tT\tC\t10\tPASS\tDP=100
";

    fn vcf_score() -> VcfInfoScore {
        let mut files = BTreeMap::new();
        files.insert(
            "vcf/genomic_resource.yaml".to_string(),
            CONFIG.as_bytes().to_vec(),
        );
        files.insert("vcf/data.vcf".to_string(), VCF.as_bytes().to_vec());
        let resource = build_inmemory_repository("demo", files)
            .get_resource("vcf", None)
            .unwrap();
        VcfInfoScore::open(&resource).unwrap()
    }

    #[test]
    fn test_per_allele_info_expansion() {
        let mut score = vcf_score();
        let values = score.fetch_scores("1", 10, "A", "T", None).unwrap().unwrap();
        assert_eq!(
            values,
            vec![
                Some(AttributeValue::Float(0.20)),
                Some(AttributeValue::Int(1)),
            ]
        );

        let values = score.fetch_scores("1", 10, "A", "C", None).unwrap().unwrap();
        assert_eq!(values[0], Some(AttributeValue::Float(0.01)));
    }

    #[test]
    fn test_absent_allele_vs_missing_value() {
        let mut score = vcf_score();
        // allele not in the table at all
        assert!(score.fetch_scores("1", 10, "A", "G", None).unwrap().is_none());
        // allele present, requested key absent from INFO
        let values = score.fetch_scores("2", 5, "T", "C", None).unwrap().unwrap();
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn test_indel_allele() {
        let mut score = vcf_score();
        let values = score
            .fetch_scores("1", 15, "G", "GA", Some(&["AF"]))
            .unwrap()
            .unwrap();
        assert_eq!(values, vec![Some(AttributeValue::Float(0.5))]);
    }
}
