//! Attribute declarations published by annotators.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use grr_core::AttributeValue;
use grr_scores::ScoreType;

/// Value type of a declared annotation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Str,
    Int,
    Float,
    Annotatable,
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Str => "str",
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Annotatable => "annotatable",
        };
        write!(f, "{}", name)
    }
}

impl From<ScoreType> for AttributeType {
    fn from(value: ScoreType) -> AttributeType {
        match value {
            ScoreType::Float => AttributeType::Float,
            ScoreType::Int => AttributeType::Int,
            ScoreType::Str => AttributeType::Str,
        }
    }
}

/// One attribute an annotator contributes to the pipeline output.
///
/// `source` names the value inside the annotator's resource (a score
/// id, or a context key for coordinate annotators); `name` is the
/// pipeline-visible key after renaming. Internal attributes stay in
/// the annotation context and are not part of the pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub value_type: AttributeType,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub description: String,
}

/// The attribute values one annotator produced for one annotatable.
/// `None` is the "no value" result.
pub type AttributeMap = BTreeMap<String, Option<AttributeValue>>;

/// A "no value" result covering all of an annotator's attributes.
pub fn empty_result(attributes: &[AttributeInfo]) -> AttributeMap {
    attributes
        .iter()
        .map(|info| (info.name.clone(), None))
        .collect()
}
