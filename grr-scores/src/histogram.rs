//! Number histograms and min/max statistics of score columns.
//!
//! Histograms computed per chromosome merge into the resource-wide
//! one, so the bin layout is fixed by the configured view range.

use serde::{Deserialize, Serialize};

use crate::config::{HistogramConfig, HistogramScale};
use crate::error::{Result, ScoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberHistogram {
    pub score_id: String,
    pub config: HistogramConfig,
    pub bars: Vec<u64>,
    /// Smallest and largest values observed, NA excluded.
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl NumberHistogram {
    pub fn new(score_id: &str, config: HistogramConfig) -> Result<NumberHistogram> {
        let Some(view_range) = config.view_range else {
            return Err(ScoreError::Histogram {
                score_id: score_id.to_string(),
                message: "histogram needs a view_range".to_string(),
            });
        };
        if !(view_range.min < view_range.max) {
            return Err(ScoreError::Histogram {
                score_id: score_id.to_string(),
                message: format!(
                    "empty view range [{}, {}]",
                    view_range.min, view_range.max
                ),
            });
        }
        if config.scale == HistogramScale::Log && view_range.min <= 0.0 {
            return Err(ScoreError::Histogram {
                score_id: score_id.to_string(),
                message: "log scale needs a positive view range".to_string(),
            });
        }
        if config.number_of_bins == 0 {
            return Err(ScoreError::Histogram {
                score_id: score_id.to_string(),
                message: "number_of_bins must be positive".to_string(),
            });
        }
        Ok(NumberHistogram {
            score_id: score_id.to_string(),
            bars: vec![0; config.number_of_bins],
            config,
            min_value: None,
            max_value: None,
        })
    }

    fn bin_index(&self, value: f64) -> usize {
        let range = self.config.view_range.expect("checked at construction");
        let bins = self.bars.len();
        let fraction = match self.config.scale {
            HistogramScale::Linear => {
                (value - range.min) / (range.max - range.min)
            }
            HistogramScale::Log => {
                let value = value.max(range.min);
                (value.ln() - range.min.ln()) / (range.max.ln() - range.min.ln())
            }
        };
        // out-of-range values land in the edge bins
        ((fraction * bins as f64) as isize).clamp(0, bins as isize - 1) as usize
    }

    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        let index = self.bin_index(value);
        self.bars[index] += 1;
        self.min_value = Some(self.min_value.map_or(value, |m| m.min(value)));
        self.max_value = Some(self.max_value.map_or(value, |m| m.max(value)));
    }

    /// Add `count` occurrences of a value, for rows spanning several
    /// positions.
    pub fn add_count(&mut self, value: f64, count: u64) {
        if value.is_nan() || count == 0 {
            return;
        }
        let index = self.bin_index(value);
        self.bars[index] += count;
        self.min_value = Some(self.min_value.map_or(value, |m| m.min(value)));
        self.max_value = Some(self.max_value.map_or(value, |m| m.max(value)));
    }

    pub fn total(&self) -> u64 {
        self.bars.iter().sum()
    }

    pub fn merge(&mut self, other: &NumberHistogram) -> Result<()> {
        if self.config != other.config || self.score_id != other.score_id {
            return Err(ScoreError::Histogram {
                score_id: self.score_id.clone(),
                message: "can't merge histograms with different layouts".to_string(),
            });
        }
        for (bar, other_bar) in self.bars.iter_mut().zip(&other.bars) {
            *bar += other_bar;
        }
        self.min_value = match (self.min_value, other.min_value) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_value = match (self.max_value, other.max_value) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(())
    }
}

/// Running min/max/count of one score column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MinMax {
    pub score_id: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: u64,
}

impl MinMax {
    pub fn new(score_id: &str) -> MinMax {
        MinMax {
            score_id: score_id.to_string(),
            ..Default::default()
        }
    }

    pub fn add_count(&mut self, value: f64, count: u64) {
        if value.is_nan() || count == 0 {
            return;
        }
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.count += count;
    }

    pub fn merge(&mut self, other: &MinMax) {
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.count += other.count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewRange;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn linear(bins: usize, min: f64, max: f64) -> NumberHistogram {
        NumberHistogram::new(
            "test",
            HistogramConfig {
                scale: HistogramScale::Linear,
                number_of_bins: bins,
                view_range: Some(ViewRange { min, max }),
            },
        )
        .unwrap()
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.09, 0)]
    #[case(0.55, 5)]
    #[case(0.99, 9)]
    #[case(1.0, 9)]
    #[case(-5.0, 0)]
    #[case(7.0, 9)]
    fn test_linear_binning(#[case] value: f64, #[case] bin: usize) {
        let mut histogram = linear(10, 0.0, 1.0);
        histogram.add(value);
        assert_eq!(histogram.bars[bin], 1);
        assert_eq!(histogram.total(), 1);
    }

    #[test]
    fn test_log_binning() {
        let mut histogram = NumberHistogram::new(
            "test",
            HistogramConfig {
                scale: HistogramScale::Log,
                number_of_bins: 3,
                view_range: Some(ViewRange {
                    min: 1.0,
                    max: 1000.0,
                }),
            },
        )
        .unwrap();
        histogram.add(5.0); // bin 0: [1, 10)
        histogram.add(50.0); // bin 1: [10, 100)
        histogram.add(500.0); // bin 2: [100, 1000]
        assert_eq!(histogram.bars, vec![1, 1, 1]);
    }

    #[test]
    fn test_merge_per_chromosome_parts() {
        let mut merged = linear(4, 0.0, 1.0);
        let mut part = linear(4, 0.0, 1.0);
        merged.add(0.1);
        part.add(0.9);
        part.add(0.6);
        merged.merge(&part).unwrap();
        assert_eq!(merged.total(), 3);
        assert_eq!(merged.min_value, Some(0.1));
        assert_eq!(merged.max_value, Some(0.9));

        let other_layout = linear(8, 0.0, 1.0);
        assert!(merged.merge(&other_layout).is_err());
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert!(
            NumberHistogram::new(
                "test",
                HistogramConfig {
                    scale: HistogramScale::Log,
                    number_of_bins: 10,
                    view_range: Some(ViewRange { min: 0.0, max: 1.0 }),
                },
            )
            .is_err()
        );
        assert!(
            NumberHistogram::new(
                "test",
                HistogramConfig {
                    scale: HistogramScale::Linear,
                    number_of_bins: 10,
                    view_range: None,
                },
            )
            .is_err()
        );
    }

    #[test]
    fn test_min_max() {
        let mut stats = MinMax::new("test");
        stats.add_count(0.5, 3);
        stats.add_count(0.1, 1);
        let mut other = MinMax::new("test");
        other.add_count(0.9, 2);
        stats.merge(&other);
        assert_eq!(stats.min, Some(0.1));
        assert_eq!(stats.max, Some(0.9));
        assert_eq!(stats.count, 6);
    }
}
