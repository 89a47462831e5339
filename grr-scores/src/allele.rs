//! Allele scores: one row per known variant allele.

use grr_core::AttributeValue;
use grr_repository::Resource;

use crate::error::Result;
use crate::score::GenomicScore;

pub struct AlleleScore {
    score: GenomicScore,
}

impl AlleleScore {
    pub fn open(resource: &Resource) -> Result<AlleleScore> {
        Ok(AlleleScore {
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

    /// Values for one allele, or `None` when the allele is unknown to
    /// the table.
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
            line.pos_begin == pos
                && line.reference.as_deref() == Some(reference)
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
}
