//! Resource configuration (`genomic_resource.yaml`).
//!
//! The configuration keeps its raw YAML form; typed layers deserialize
//! the sections they own on demand via [`ResourceConfig::section`].

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::error::{RepositoryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    raw: Value,
}

impl ResourceConfig {
    pub fn from_yaml_str(resource_id: &str, text: &str) -> Result<ResourceConfig> {
        let raw: Value =
            serde_yaml::from_str(text).map_err(|err| RepositoryError::Config {
                resource_id: resource_id.to_string(),
                message: err.to_string(),
            })?;
        if !matches!(raw, Value::Mapping(_) | Value::Null) {
            return Err(RepositoryError::Config {
                resource_id: resource_id.to_string(),
                message: "configuration must be a YAML mapping".to_string(),
            });
        }
        Ok(ResourceConfig { raw })
    }

    pub fn empty() -> ResourceConfig {
        ResourceConfig { raw: Value::Null }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The declared resource type; an omitted type means `basic`.
    pub fn resource_type(&self) -> &str {
        self.get_str("type").unwrap_or("basic")
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    /// Free-text description from the `meta` section, if any.
    pub fn description(&self) -> Option<&str> {
        self.raw
            .get("meta")
            .and_then(|meta| meta.get("description"))
            .and_then(Value::as_str)
    }

    pub fn labels(&self) -> Option<&Value> {
        self.raw.get("meta").and_then(|meta| meta.get("labels"))
    }

    /// Deserialize one top-level section into a typed structure.
    ///
    /// Returns `Ok(None)` when the section is absent.
    pub fn section<T: DeserializeOwned>(
        &self,
        resource_id: &str,
        key: &str,
    ) -> Result<Option<T>> {
        let Some(value) = self.raw.get(key) else {
            return Ok(None);
        };
        serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|err| RepositoryError::Config {
                resource_id: resource_id.to_string(),
                message: format!("bad section <{}>: {}", key, err),
            })
    }

    /// Deserialize the whole configuration into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self, resource_id: &str) -> Result<T> {
        serde_yaml::from_value(self.raw.clone()).map_err(|err| {
            RepositoryError::Config {
                resource_id: resource_id.to_string(),
                message: err.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    const CONFIG_YAML: &str = "\
type: position_score
table:
  filename: scores.txt.gz
scores:
- id: phastCons100way
  type: float
meta:
  description: phastCons conservation scores
";

    #[test]
    fn test_resource_type() {
        let config = ResourceConfig::from_yaml_str("test", CONFIG_YAML).unwrap();
        assert_eq!(config.resource_type(), "position_score");

        let untyped = ResourceConfig::from_yaml_str("test", "meta: {}").unwrap();
        assert_eq!(untyped.resource_type(), "basic");
    }

    #[test]
    fn test_description() {
        let config = ResourceConfig::from_yaml_str("test", CONFIG_YAML).unwrap();
        assert_eq!(
            config.description(),
            Some("phastCons conservation scores")
        );
    }

    #[test]
    fn test_typed_section() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct TableSection {
            filename: String,
        }

        let config = ResourceConfig::from_yaml_str("test", CONFIG_YAML).unwrap();
        let table: Option<TableSection> = config.section("test", "table").unwrap();
        assert_eq!(
            table,
            Some(TableSection {
                filename: "scores.txt.gz".to_string()
            })
        );
        let missing: Option<TableSection> = config.section("test", "absent").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_rejects_non_mapping() {
        assert!(ResourceConfig::from_yaml_str("test", "- a\n- b\n").is_err());
    }
}
