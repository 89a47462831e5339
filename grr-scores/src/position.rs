//! Position scores: one value per score per covered position.

use std::collections::HashMap;

use grr_core::AttributeValue;
use grr_repository::Resource;

use crate::config::ScoreDef;
use crate::error::Result;
use crate::score::GenomicScore;

pub struct PositionScore {
    score: GenomicScore,
}

impl PositionScore {
    pub fn open(resource: &Resource) -> Result<PositionScore> {
        Ok(PositionScore {
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

    /// Values of the selected scores at one position, or `None` when
    /// no row covers the position.
    pub fn fetch_scores(
        &mut self,
        chrom: &str,
        pos: u64,
        score_ids: Option<&[&str]>,
    ) -> Result<Option<Vec<Option<AttributeValue>>>> {
        let selection = self.score.resolve_selection(score_ids)?;
        let lines = self.score.fetch_lines(chrom, Some(pos), Some(pos))?;
        let Some(line) = lines.first() else {
            return Ok(None);
        };
        Ok(Some(
            selection
                .iter()
                .map(|&index| self.score.line_value(line, index))
                .collect(),
        ))
    }

    /// Aggregate the selected scores over a closed region.
    ///
    /// Each row feeds the aggregators once per position it overlaps
    /// the query with, so the result matches aggregating per-position
    /// fetches.
    pub fn fetch_scores_agg(
        &mut self,
        chrom: &str,
        pos_begin: u64,
        pos_end: u64,
        score_ids: Option<&[&str]>,
        aggregator_overrides: Option<&HashMap<String, String>>,
    ) -> Result<Vec<Option<AttributeValue>>> {
        let selection = self.score.resolve_selection(score_ids)?;
        let mut aggregators = self.score.build_aggregators(
            &selection,
            ScoreDef::position_aggregator_spec,
            aggregator_overrides,
        )?;
        let lines = self
            .score
            .fetch_lines(chrom, Some(pos_begin), Some(pos_end))?;
        for line in &lines {
            let count = line.overlap(pos_begin, pos_end);
            for (slot, &index) in selection.iter().enumerate() {
                if let Some(value) = self.score.line_value(line, index) {
                    aggregators[slot].add(&value, count);
                }
            }
        }
        Ok(aggregators.iter().map(|a| a.result()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use grr_repository::build_inmemory_repository;

    pub(crate) fn position_score_resource(
        config: &str,
        table: &str,
    ) -> grr_repository::Resource {
        let mut files = BTreeMap::new();
        files.insert(
            "scores/genomic_resource.yaml".to_string(),
            config.as_bytes().to_vec(),
        );
        files.insert("scores/data.txt".to_string(), table.as_bytes().to_vec());
        build_inmemory_repository("demo", files)
            .get_resource("scores", None)
            .unwrap()
    }

    const CONFIG: &str = r"
type: position_score
table:
  filename: data.txt
scores:
- id: phast
  type: float
  name: phast
";

    const TABLE: &str = "\
chrom\tpos_begin\tpos_end\tphast
1\t10\t12\t0.1
1\t13\t13\t0.4
1\t20\t29\t1.0
";

    #[test]
    fn test_point_fetch() {
        let resource = position_score_resource(CONFIG, TABLE);
        let mut score = PositionScore::open(&resource).unwrap();

        let values = score.fetch_scores("1", 11, None).unwrap().unwrap();
        assert_eq!(values, vec![Some(AttributeValue::Float(0.1))]);

        assert!(score.fetch_scores("1", 15, None).unwrap().is_none());
        assert!(score.fetch_scores("7", 15, None).unwrap().is_none());
    }

    fn assert_close(value: &Option<AttributeValue>, expected: f64) {
        let value = value.as_ref().and_then(|v| v.as_f64()).unwrap();
        assert!(
            (value - expected).abs() < 1e-9,
            "expected {} to be close to {}",
            value,
            expected
        );
    }

    #[test]
    fn test_region_aggregation_weighted_by_overlap() {
        let resource = position_score_resource(CONFIG, TABLE);
        let mut score = PositionScore::open(&resource).unwrap();

        // positions 10..13 carry 0.1, 0.1, 0.1, 0.4
        let values = score
            .fetch_scores_agg("1", 10, 13, None, None)
            .unwrap();
        assert_close(&values[0], 0.175);

        // partial overlap counts only the covered positions
        // covered: 12->0.1, 13->0.4, 20->1.0, 21->1.0
        let values = score
            .fetch_scores_agg("1", 12, 21, None, None)
            .unwrap();
        assert_close(&values[0], 0.625);
    }

    #[test]
    fn test_aggregation_matches_per_position_fetches() {
        let resource = position_score_resource(CONFIG, TABLE);
        let mut score = PositionScore::open(&resource).unwrap();

        let aggregated = score
            .fetch_scores_agg("1", 8, 30, None, None)
            .unwrap();

        let mut sum = 0.0;
        let mut n = 0u64;
        for pos in 8..=30 {
            if let Some(values) = score.fetch_scores("1", pos, None).unwrap() {
                if let Some(v) = values[0].as_ref().and_then(|v| v.as_f64()) {
                    sum += v;
                    n += 1;
                }
            }
        }
        assert!(n > 0);
        assert_close(&aggregated[0], sum / n as f64);
    }

    #[test]
    fn test_aggregator_override() {
        let resource = position_score_resource(CONFIG, TABLE);
        let mut score = PositionScore::open(&resource).unwrap();
        let overrides: HashMap<String, String> =
            [("phast".to_string(), "max".to_string())].into();
        let values = score
            .fetch_scores_agg("1", 10, 29, None, Some(&overrides))
            .unwrap();
        assert_eq!(values, vec![Some(AttributeValue::Float(1.0))]);
    }

    #[test]
    fn test_uncovered_region_yields_no_score() {
        let resource = position_score_resource(CONFIG, TABLE);
        let mut score = PositionScore::open(&resource).unwrap();
        let values = score
            .fetch_scores_agg("1", 100, 200, None, None)
            .unwrap();
        assert_eq!(values, vec![None]);
    }
}
