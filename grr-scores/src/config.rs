//! Score resource configuration: the `scores` section of
//! `genomic_resource.yaml` plus per-score histogram settings.

use serde::{Deserialize, Serialize};

use grr_core::AttributeValue;
use grr_tables::TableConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    #[default]
    Float,
    Int,
    Str,
}

impl ScoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Float => "float",
            ScoreType::Int => "int",
            ScoreType::Str => "str",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScoreType::Float | ScoreType::Int)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    #[serde(default)]
    pub scale: HistogramScale,
    #[serde(default = "default_bins")]
    pub number_of_bins: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_range: Option<ViewRange>,
}

fn default_bins() -> usize {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramScale {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRange {
    pub min: f64,
    pub max: f64,
}

/// One score column of a score resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub value_type: ScoreType,
    /// Column holding the score; defaults to a column named after the
    /// score id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub na_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_aggregator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nucleotide_aggregator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allele_aggregator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramConfig>,
}

impl ScoreDef {
    /// Is the raw text an NA marker for this score?
    pub fn is_na(&self, text: &str) -> bool {
        match &self.na_values {
            Some(na_values) => na_values.iter().any(|na| na == text),
            None => {
                if self.value_type.is_numeric() {
                    matches!(text, "" | "nan" | "." | "NA")
                } else {
                    false
                }
            }
        }
    }

    /// Parse a raw column value; `None` for NA or unparsable content.
    pub fn parse_value(&self, text: &str) -> Option<AttributeValue> {
        if self.is_na(text) {
            return None;
        }
        match self.value_type {
            ScoreType::Float => text.parse::<f64>().ok().map(AttributeValue::Float),
            ScoreType::Int => text.parse::<i64>().ok().map(AttributeValue::Int),
            ScoreType::Str => Some(AttributeValue::Str(text.to_string())),
        }
    }

    /// Aggregator used across positions of a region query.
    pub fn position_aggregator_spec(&self) -> &str {
        match &self.position_aggregator {
            Some(spec) => spec,
            None if self.value_type.is_numeric() => "mean",
            None => "concatenate",
        }
    }

    /// Aggregator used across nucleotides at one position.
    pub fn nucleotide_aggregator_spec(&self) -> &str {
        match &self.nucleotide_aggregator {
            Some(spec) => spec,
            None if self.value_type.is_numeric() => "max",
            None => "concatenate",
        }
    }

    pub fn allele_aggregator_spec(&self) -> &str {
        match &self.allele_aggregator {
            Some(spec) => spec,
            None if self.value_type.is_numeric() => "max",
            None => "concatenate",
        }
    }
}

/// The full typed configuration of a score resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub table: TableConfig,
    pub scores: Vec<ScoreDef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_score_config() {
        let text = r"
table:
  filename: scores.txt.gz
scores:
- id: phast
  type: float
  name: phastCons100way
  position_aggregator: max
- id: effect
  type: str
";
        let config: ScoreConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(config.scores.len(), 2);
        assert_eq!(config.scores[0].value_type, ScoreType::Float);
        assert_eq!(config.scores[0].position_aggregator_spec(), "max");
        assert_eq!(config.scores[1].position_aggregator_spec(), "concatenate");
        assert_eq!(config.scores[1].nucleotide_aggregator_spec(), "concatenate");
    }

    #[rstest]
    #[case("", true)]
    #[case("nan", true)]
    #[case(".", true)]
    #[case("NA", true)]
    #[case("0.5", false)]
    fn test_default_numeric_na(#[case] text: &str, #[case] expected: bool) {
        let def = ScoreDef {
            id: "s".to_string(),
            value_type: ScoreType::Float,
            name: None,
            index: None,
            desc: None,
            na_values: None,
            position_aggregator: None,
            nucleotide_aggregator: None,
            allele_aggregator: None,
            histogram: None,
        };
        assert_eq!(def.is_na(text), expected);
    }

    #[test]
    fn test_parse_value() {
        let def = ScoreDef {
            id: "s".to_string(),
            value_type: ScoreType::Float,
            name: None,
            index: None,
            desc: None,
            na_values: Some(vec!["-".to_string()]),
            position_aggregator: None,
            nucleotide_aggregator: None,
            allele_aggregator: None,
            histogram: None,
        };
        assert_eq!(def.parse_value("0.25"), Some(AttributeValue::Float(0.25)));
        assert_eq!(def.parse_value("-"), None);
        // configured na_values replace the defaults
        assert_eq!(def.parse_value("junk"), None);
    }
}
