//! Annotation pipeline configuration.
//!
//! A pipeline config is a YAML list of annotator entries in one of
//! three forms:
//!
//! ```yaml
//! - normalize_allele_annotator                 # minimal
//! - position_score: hg38/scores/phastCons      # short
//! - np_score:                                  # full
//!     resource_id: hg38/scores/cadd
//!     attributes:
//!     - source: cadd_raw
//!       name: cadd
//!       position_aggregator: max
//! ```

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{AnnotationError, Result};

/// One attribute entry of a full-form annotator config.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Deprecated alias for `name`.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub position_aggregator: Option<String>,
    #[serde(default)]
    pub nucleotide_aggregator: Option<String>,
}

impl AttributeConfig {
    /// Pipeline-visible attribute name; `name` (or its deprecated
    /// `destination` spelling) falling back to `source`.
    pub fn resolved_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.destination.as_deref())
            .or(self.source.as_deref())
    }

    /// Value source inside the annotator's resource, falling back to
    /// the attribute name.
    pub fn resolved_source(&self) -> Option<&str> {
        self.source
            .as_deref()
            .or(self.name.as_deref())
            .or(self.destination.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    pub annotator_id: String,
    pub annotator_type: String,
    pub resource_id: Option<String>,
    pub input_annotatable: Option<String>,
    pub attributes: Vec<AttributeConfig>,
}

impl AnnotatorConfig {
    pub fn new(annotator_type: impl Into<String>, index: usize) -> AnnotatorConfig {
        AnnotatorConfig {
            annotator_id: format!("A{}", index),
            annotator_type: annotator_type.into(),
            resource_id: None,
            input_annotatable: None,
            attributes: Vec::new(),
        }
    }

    /// The resource id, which most annotator types require.
    pub fn require_resource_id(&self) -> Result<&str> {
        self.resource_id
            .as_deref()
            .ok_or_else(|| AnnotationError::Config {
                annotator_id: self.annotator_id.clone(),
                message: "no resource_id configured".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FullForm {
    #[serde(default)]
    resource_id: Option<String>,
    #[serde(default)]
    input_annotatable: Option<String>,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAttribute {
    Name(String),
    Full(AttributeConfig),
}

impl From<RawAttribute> for AttributeConfig {
    fn from(raw: RawAttribute) -> AttributeConfig {
        match raw {
            RawAttribute::Name(name) => AttributeConfig {
                name: Some(name),
                ..AttributeConfig::default()
            },
            RawAttribute::Full(config) => config,
        }
    }
}

/// Parse a pipeline configuration string.
pub fn parse_pipeline_str(content: &str) -> Result<Vec<AnnotatorConfig>> {
    let raw: Value = serde_yaml::from_str(content)?;
    let Value::Sequence(entries) = raw else {
        return Err(AnnotationError::PipelineConfig(
            "the pipeline configuration must be a list of annotators".to_string(),
        ));
    };

    let mut configs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        configs.push(parse_annotator_entry(entry, index)?);
    }
    Ok(configs)
}

fn parse_annotator_entry(entry: Value, index: usize) -> Result<AnnotatorConfig> {
    match entry {
        Value::String(annotator_type) => Ok(AnnotatorConfig::new(annotator_type, index)),
        Value::Mapping(mapping) => {
            let mut entries = mapping.into_iter();
            let (key, details) = entries.next().ok_or_else(|| {
                AnnotationError::PipelineConfig(format!("empty annotator entry {}", index))
            })?;
            if entries.next().is_some() {
                return Err(AnnotationError::PipelineConfig(format!(
                    "annotator entry {} declares more than one annotator type",
                    index
                )));
            }
            let Value::String(annotator_type) = key else {
                return Err(AnnotationError::PipelineConfig(format!(
                    "annotator entry {} has a non-string annotator type",
                    index
                )));
            };

            let mut config = AnnotatorConfig::new(annotator_type, index);
            match details {
                Value::String(resource_id) => {
                    config.resource_id = Some(resource_id);
                }
                Value::Mapping(_) => {
                    let full: FullForm =
                        serde_yaml::from_value(details).map_err(|err| {
                            AnnotationError::Config {
                                annotator_id: config.annotator_id.clone(),
                                message: err.to_string(),
                            }
                        })?;
                    config.resource_id = full.resource_id;
                    config.input_annotatable = full.input_annotatable;
                    config.attributes =
                        full.attributes.into_iter().map(Into::into).collect();
                }
                other => {
                    return Err(AnnotationError::PipelineConfig(format!(
                        "annotator entry {} has unexpected details: {:?}",
                        index, other
                    )));
                }
            }
            for attribute in &config.attributes {
                if attribute.resolved_name().is_none() {
                    return Err(AnnotationError::Config {
                        annotator_id: config.annotator_id.clone(),
                        message: "attribute with neither name nor source".to_string(),
                    });
                }
            }
            Ok(config)
        }
        other => Err(AnnotationError::PipelineConfig(format!(
            "unexpected annotator entry {}: {:?}",
            index, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_all_forms() {
        let configs = parse_pipeline_str(
            r"
- normalize_allele_annotator
- position_score: hg38/scores/phastCons100way
- np_score:
    resource_id: hg38/scores/cadd
    input_annotatable: normalized_allele
    attributes:
    - source: cadd_raw
      name: cadd
      position_aggregator: max
    - cadd_phred
",
        )
        .unwrap();

        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0].annotator_type, "normalize_allele_annotator");
        assert_eq!(configs[0].annotator_id, "A0");
        assert_eq!(configs[0].resource_id, None);

        assert_eq!(configs[1].annotator_type, "position_score");
        assert_eq!(
            configs[1].resource_id.as_deref(),
            Some("hg38/scores/phastCons100way")
        );

        let np = &configs[2];
        assert_eq!(np.input_annotatable.as_deref(), Some("normalized_allele"));
        assert_eq!(np.attributes.len(), 2);
        assert_eq!(np.attributes[0].resolved_name(), Some("cadd"));
        assert_eq!(np.attributes[0].resolved_source(), Some("cadd_raw"));
        assert_eq!(
            np.attributes[0].position_aggregator.as_deref(),
            Some("max")
        );
        assert_eq!(np.attributes[1].resolved_name(), Some("cadd_phred"));
        assert_eq!(np.attributes[1].resolved_source(), Some("cadd_phred"));
    }

    #[test]
    fn test_destination_is_a_name_alias() {
        let configs = parse_pipeline_str(
            r"
- position_score:
    resource_id: scores/one
    attributes:
    - source: s1
      destination: score
",
        )
        .unwrap();
        assert_eq!(configs[0].attributes[0].resolved_name(), Some("score"));
        assert_eq!(configs[0].attributes[0].resolved_source(), Some("s1"));
    }

    #[test]
    fn test_bad_configurations_rejected() {
        assert!(parse_pipeline_str("position_score: a").is_err());
        assert!(parse_pipeline_str("- position_score: [1, 2]").is_err());
        assert!(
            parse_pipeline_str(
                "- position_score:\n    resource_id: a\n    no_such_parameter: 1\n"
            )
            .is_err()
        );
        assert!(
            parse_pipeline_str(
                "- position_score:\n    resource_id: a\n    attributes:\n    - internal: true\n"
            )
            .is_err()
        );
    }
}
