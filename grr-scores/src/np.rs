//! Nucleotide-position scores: one row per (position, reference,
//! alternative) nucleotide pair.

use std::collections::HashMap;

use grr_core::AttributeValue;
use grr_repository::Resource;
use grr_tables::Line;

use crate::config::ScoreDef;
use crate::error::Result;
use crate::score::GenomicScore;

pub struct NpScore {
    score: GenomicScore,
}

impl NpScore {
    pub fn open(resource: &Resource) -> Result<NpScore> {
        Ok(NpScore {
            score: GenomicScore::open(resource)?,
        })
    }

    pub fn inner(&self) -> &GenomicScore {
        &self.score
    }

    pub fn score_ids(&self) -> Vec<&str> {
        self.score.score_ids()
    }

    pub fn chromosomes(&self) -> Vec<String> {
        self.score.chromosomes()
    }

    /// Values for one substitution, or `None` when the table has no
    /// row for it.
    pub fn fetch_scores(
        &mut self,
        chrom: &str,
        pos: u64,
        reference: &str,
        alternative: &str,
        score_ids: Option<&[&str]>,
    ) -> Result<Option<Vec<Option<AttributeValue>>>> {
        let selection = self.score.resolve_selection(score_ids)?;
        let lines = self.score.fetch_lines(chrom, Some(pos), Some(pos))?;
        let Some(line) = lines.iter().find(|line| {
            line.reference.as_deref() == Some(reference)
                && line.alternative.as_deref() == Some(alternative)
        }) else {
            return Ok(None);
        };
        Ok(Some(
            selection
                .iter()
                .map(|&index| self.score.line_value(line, index))
                .collect(),
        ))
    }

    /// Two-stage aggregation over a region: nucleotide rows of each
    /// position are reduced first, then the per-position results feed
    /// the position aggregator.
    pub fn fetch_scores_agg(
        &mut self,
        chrom: &str,
        pos_begin: u64,
        pos_end: u64,
        score_ids: Option<&[&str]>,
        position_overrides: Option<&HashMap<String, String>>,
        nucleotide_overrides: Option<&HashMap<String, String>>,
    ) -> Result<Vec<Option<AttributeValue>>> {
        let selection = self.score.resolve_selection(score_ids)?;
        let mut position_aggregators = self.score.build_aggregators(
            &selection,
            ScoreDef::position_aggregator_spec,
            position_overrides,
        )?;
        let mut nucleotide_aggregators = self.score.build_aggregators(
            &selection,
            ScoreDef::nucleotide_aggregator_spec,
            nucleotide_overrides,
        )?;

        let lines = self
            .score
            .fetch_lines(chrom, Some(pos_begin), Some(pos_end))?;

        let mut flush = |aggregators: &mut Vec<Box<dyn crate::aggregators::Aggregator>>,
                         position_aggregators: &mut Vec<
            Box<dyn crate::aggregators::Aggregator>,
        >| {
            for (nucleotide, position) in
                aggregators.iter_mut().zip(position_aggregators.iter_mut())
            {
                if let Some(value) = nucleotide.result() {
                    position.add(&value, 1);
                }
                nucleotide.clear();
            }
        };

        let mut current_pos: Option<u64> = None;
        for line in &lines {
            if current_pos.is_some() && current_pos != Some(line.pos_begin) {
                flush(&mut nucleotide_aggregators, &mut position_aggregators);
            }
            current_pos = Some(line.pos_begin);
            self.add_line(line, &selection, &mut nucleotide_aggregators);
        }
        if current_pos.is_some() {
            flush(&mut nucleotide_aggregators, &mut position_aggregators);
        }

        Ok(position_aggregators.iter().map(|a| a.result()).collect())
    }

    fn add_line(
        &self,
        line: &Line,
        selection: &[usize],
        aggregators: &mut [Box<dyn crate::aggregators::Aggregator>],
    ) {
        for (slot, &index) in selection.iter().enumerate() {
            if let Some(value) = self.score.line_value(line, index) {
                aggregators[slot].add(&value, 1);
            }
        }
    }
}
