//! Value aggregators for region score queries.
//!
//! An aggregator receives each row value together with the number of
//! positions the row contributes to the query interval, so that an
//! aggregated fetch over a region equals aggregating the per-position
//! fetches of the same region.

use grr_core::AttributeValue;

use crate::error::{Result, ScoreError};

pub trait Aggregator: Send {
    /// Add a value `count` times. NA values are not added at all.
    fn add(&mut self, value: &AttributeValue, count: u64);

    /// The aggregate, or `None` when nothing was added.
    fn result(&self) -> Option<AttributeValue>;

    fn clear(&mut self);
}

/// Parse an aggregator specification: `mean`, `max`, `min`, `sum`,
/// `count`, `median`, `mode`, `concatenate` or `join(SEP)`.
pub fn parse_aggregator(spec: &str) -> Result<Box<dyn Aggregator>> {
    let spec = spec.trim();
    match spec {
        "mean" => Ok(Box::new(MeanAggregator::default())),
        "max" => Ok(Box::new(MaxAggregator::default())),
        "min" => Ok(Box::new(MinAggregator::default())),
        "sum" => Ok(Box::new(SumAggregator::default())),
        "count" => Ok(Box::new(CountAggregator::default())),
        "median" => Ok(Box::new(MedianAggregator::default())),
        "mode" => Ok(Box::new(ModeAggregator::default())),
        "concatenate" => Ok(Box::new(JoinAggregator::new(""))),
        _ => {
            if let Some(rest) = spec.strip_prefix("join(") {
                if let Some(separator) = rest.strip_suffix(')') {
                    return Ok(Box::new(JoinAggregator::new(separator)));
                }
            }
            Err(ScoreError::UnknownAggregator(spec.to_string()))
        }
    }
}

#[derive(Default)]
pub struct MeanAggregator {
    sum: f64,
    count: u64,
}

impl Aggregator for MeanAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if let Some(v) = value.as_f64() {
            self.sum += v * count as f64;
            self.count += count;
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        (self.count > 0).then(|| AttributeValue::Float(self.sum / self.count as f64))
    }

    fn clear(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

#[derive(Default)]
pub struct MaxAggregator {
    max: Option<f64>,
}

impl Aggregator for MaxAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if count == 0 {
            return;
        }
        if let Some(v) = value.as_f64() {
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        self.max.map(AttributeValue::Float)
    }

    fn clear(&mut self) {
        self.max = None;
    }
}

#[derive(Default)]
pub struct MinAggregator {
    min: Option<f64>,
}

impl Aggregator for MinAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if count == 0 {
            return;
        }
        if let Some(v) = value.as_f64() {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        self.min.map(AttributeValue::Float)
    }

    fn clear(&mut self) {
        self.min = None;
    }
}

#[derive(Default)]
pub struct SumAggregator {
    sum: f64,
    count: u64,
}

impl Aggregator for SumAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if let Some(v) = value.as_f64() {
            self.sum += v * count as f64;
            self.count += count;
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        (self.count > 0).then_some(AttributeValue::Float(self.sum))
    }

    fn clear(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

#[derive(Default)]
pub struct CountAggregator {
    count: u64,
}

impl Aggregator for CountAggregator {
    fn add(&mut self, _value: &AttributeValue, count: u64) {
        self.count += count;
    }

    fn result(&self) -> Option<AttributeValue> {
        (self.count > 0).then_some(AttributeValue::Int(self.count as i64))
    }

    fn clear(&mut self) {
        self.count = 0;
    }
}

#[derive(Default)]
pub struct MedianAggregator {
    values: Vec<(f64, u64)>,
}

impl Aggregator for MedianAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if count == 0 {
            return;
        }
        if let Some(v) = value.as_f64() {
            self.values.push((v, count));
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        if self.values.is_empty() {
            return None;
        }
        let mut values = self.values.clone();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total: u64 = values.iter().map(|(_, c)| c).sum();
        let middle = total / 2;
        let mut seen = 0u64;
        let mut lower = values[0].0;
        for (v, c) in &values {
            if seen + c > middle {
                // even totals average the two middle values
                if total % 2 == 0 && seen == middle {
                    return Some(AttributeValue::Float((lower + v) / 2.0));
                }
                return Some(AttributeValue::Float(*v));
            }
            seen += c;
            lower = *v;
        }
        Some(AttributeValue::Float(lower))
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

#[derive(Default)]
pub struct ModeAggregator {
    counts: Vec<(String, u64)>,
}

impl Aggregator for ModeAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        if count == 0 {
            return;
        }
        let key = value.to_string();
        match self.counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, c)) => *c += count,
            None => self.counts.push((key, count)),
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        self.counts
            .iter()
            .max_by_key(|(_, c)| *c)
            .map(|(k, _)| AttributeValue::Str(k.clone()))
    }

    fn clear(&mut self) {
        self.counts.clear();
    }
}

pub struct JoinAggregator {
    separator: String,
    values: Vec<String>,
}

impl JoinAggregator {
    pub fn new(separator: &str) -> JoinAggregator {
        JoinAggregator {
            separator: separator.to_string(),
            values: Vec::new(),
        }
    }
}

impl Aggregator for JoinAggregator {
    fn add(&mut self, value: &AttributeValue, count: u64) {
        for _ in 0..count {
            self.values.push(value.to_string());
        }
    }

    fn result(&self) -> Option<AttributeValue> {
        if self.values.is_empty() {
            return None;
        }
        Some(AttributeValue::Str(self.values.join(&self.separator)))
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(spec: &str, values: &[(f64, u64)]) -> Option<AttributeValue> {
        let mut aggregator = parse_aggregator(spec).unwrap();
        for (v, c) in values {
            aggregator.add(&AttributeValue::Float(*v), *c);
        }
        aggregator.result()
    }

    #[rstest]
    #[case("mean", &[(1.0, 1), (3.0, 1)], 2.0)]
    #[case("mean", &[(1.0, 3), (5.0, 1)], 2.0)]
    #[case("max", &[(1.0, 1), (3.0, 5)], 3.0)]
    #[case("min", &[(1.0, 1), (3.0, 5)], 1.0)]
    #[case("sum", &[(1.0, 2), (3.0, 1)], 5.0)]
    #[case("median", &[(1.0, 1), (2.0, 1), (9.0, 1)], 2.0)]
    #[case("median", &[(1.0, 1), (2.0, 1), (3.0, 1), (9.0, 1)], 2.5)]
    #[case("median", &[(1.0, 3), (9.0, 1)], 1.0)]
    fn test_numeric_aggregators(
        #[case] spec: &str,
        #[case] values: &[(f64, u64)],
        #[case] expected: f64,
    ) {
        assert_eq!(run(spec, values), Some(AttributeValue::Float(expected)));
    }

    #[test]
    fn test_count() {
        assert_eq!(
            run("count", &[(1.0, 2), (3.0, 1)]),
            Some(AttributeValue::Int(3))
        );
    }

    #[test]
    fn test_empty_result_is_none() {
        assert_eq!(run("mean", &[]), None);
        assert_eq!(run("max", &[]), None);
        assert_eq!(run("join(,)", &[]), None);
    }

    #[test]
    fn test_join_and_concatenate() {
        let mut aggregator = parse_aggregator("join(;)").unwrap();
        aggregator.add(&AttributeValue::Str("A".to_string()), 1);
        aggregator.add(&AttributeValue::Str("B".to_string()), 2);
        assert_eq!(
            aggregator.result(),
            Some(AttributeValue::Str("A;B;B".to_string()))
        );

        let mut aggregator = parse_aggregator("concatenate").unwrap();
        aggregator.add(&AttributeValue::Str("A".to_string()), 1);
        aggregator.add(&AttributeValue::Str("C".to_string()), 1);
        assert_eq!(
            aggregator.result(),
            Some(AttributeValue::Str("AC".to_string()))
        );
    }

    #[test]
    fn test_mode() {
        let mut aggregator = parse_aggregator("mode").unwrap();
        for value in ["splice", "intron", "splice"] {
            aggregator.add(&AttributeValue::Str(value.to_string()), 1);
        }
        assert_eq!(
            aggregator.result(),
            Some(AttributeValue::Str("splice".to_string()))
        );
    }

    #[test]
    fn test_unknown_spec() {
        assert!(parse_aggregator("average").is_err());
        assert!(parse_aggregator("join(").is_err());
    }

    #[test]
    fn test_clear() {
        let mut aggregator = parse_aggregator("mean").unwrap();
        aggregator.add(&AttributeValue::Float(4.0), 1);
        aggregator.clear();
        assert_eq!(aggregator.result(), None);
    }
}
