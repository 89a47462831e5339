//! Base machinery shared by all score resource flavors.

use std::collections::HashMap;

use grr_core::AttributeValue;
use grr_repository::Resource;
use grr_tables::{Line, PositionTable, open_table};

use crate::aggregators::{Aggregator, parse_aggregator};
use crate::config::{ScoreConfig, ScoreDef};
use crate::error::{Result, ScoreError};

/// A score resource: a position table plus typed score columns.
pub struct GenomicScore {
    resource_id: String,
    config: ScoreConfig,
    table: Box<dyn PositionTable>,
    columns: Vec<usize>,
}

impl GenomicScore {
    pub fn open(resource: &Resource) -> Result<GenomicScore> {
        let config: ScoreConfig = resource.config().deserialize(resource.id())?;
        if config.scores.is_empty() {
            return Err(ScoreError::Config {
                resource_id: resource.id().to_string(),
                message: "score resource declares no scores".to_string(),
            });
        }
        let table = open_table(resource, &config.table)?;

        let mut columns = Vec::with_capacity(config.scores.len());
        for def in &config.scores {
            let column = if let Some(index) = def.index {
                index
            } else {
                let name = def.name.as_deref().unwrap_or(&def.id);
                table.schema().column_index(name).ok_or_else(|| {
                    ScoreError::Config {
                        resource_id: resource.id().to_string(),
                        message: format!(
                            "score <{}> refers to unknown column <{}>",
                            def.id, name
                        ),
                    }
                })?
            };
            columns.push(column);
        }

        Ok(GenomicScore {
            resource_id: resource.id().to_string(),
            config,
            table,
            columns,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn score_ids(&self) -> Vec<&str> {
        self.config.scores.iter().map(|def| def.id.as_str()).collect()
    }

    pub fn score_def(&self, score_id: &str) -> Result<&ScoreDef> {
        self.config
            .scores
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

    /// Indices into the score list for a selection; `None` selects all.
    pub fn resolve_selection(&self, score_ids: Option<&[&str]>) -> Result<Vec<usize>> {
        match score_ids {
            None => Ok((0..self.config.scores.len()).collect()),
            Some(selected) => selected
                .iter()
                .map(|id| {
                    self.config
                        .scores
                        .iter()
                        .position(|def| def.id == *id)
                        .ok_or_else(|| ScoreError::UnknownScore {
                            resource_id: self.resource_id.clone(),
                            score_id: id.to_string(),
                        })
                })
                .collect(),
        }
    }

    pub fn fetch_lines(
        &mut self,
        chrom: &str,
        pos_begin: Option<u64>,
        pos_end: Option<u64>,
    ) -> Result<Vec<Line>> {
        Ok(self.table.fetch(chrom, pos_begin, pos_end)?)
    }

    /// Parsed value of one score on one line.
    pub fn line_value(&self, line: &Line, score_index: usize) -> Option<AttributeValue> {
        let def = &self.config.scores[score_index];
        let column = self.columns[score_index];
        line.get(column).and_then(|text| def.parse_value(text))
    }

    /// Build one aggregator per selected score from the given spec
    /// accessor, honoring per-call overrides keyed by score id.
    pub fn build_aggregators(
        &self,
        selection: &[usize],
        default_spec: impl Fn(&ScoreDef) -> &str,
        overrides: Option<&HashMap<String, String>>,
    ) -> Result<Vec<Box<dyn Aggregator>>> {
        selection
            .iter()
            .map(|&index| {
                let def = &self.config.scores[index];
                let spec = overrides
                    .and_then(|o| o.get(&def.id))
                    .map(String::as_str)
                    .unwrap_or_else(|| default_spec(def));
                parse_aggregator(spec)
            })
            .collect()
    }
}
