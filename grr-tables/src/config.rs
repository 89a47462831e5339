//! Table section of a resource configuration.

use serde::{Deserialize, Serialize};

/// A special column addressed either by header name or by 0-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

/// Where the column names of the table come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// First non-data line of the file, leading `#` stripped.
    #[default]
    File,
    /// Explicit `header` list in the configuration.
    List,
    /// No header; special columns must be addressed by index.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChromMappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub del_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Text,
    Tabix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TableFormat>,
    #[serde(default)]
    pub header_mode: HeaderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrom: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_begin: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_end: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrom_mapping: Option<ChromMappingConfig>,
}

impl TableConfig {
    pub fn new(filename: &str) -> TableConfig {
        TableConfig {
            filename: filename.to_string(),
            format: None,
            header_mode: HeaderMode::default(),
            header: None,
            chrom: None,
            pos_begin: None,
            pos_end: None,
            reference: None,
            alternative: None,
            chrom_mapping: None,
        }
    }

    /// Effective format: explicit, or guessed from the file name.
    pub fn effective_format(&self) -> TableFormat {
        if let Some(format) = self.format {
            return format;
        }
        if self.filename.ends_with(".bgz")
            || self.filename.ends_with(".gz")
        {
            TableFormat::Tabix
        } else {
            TableFormat::Text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_table_config() {
        let text = r"
filename: scores.txt.gz
header_mode: list
header: [chrom, start, stop, phast]
chrom: chrom
pos_begin: 1
pos_end: stop
chrom_mapping:
  add_prefix: chr
";
        let config: TableConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(config.filename, "scores.txt.gz");
        assert_eq!(config.header_mode, HeaderMode::List);
        assert_eq!(config.chrom, Some(ColumnRef::Name("chrom".to_string())));
        assert_eq!(config.pos_begin, Some(ColumnRef::Index(1)));
        assert_eq!(config.pos_end, Some(ColumnRef::Name("stop".to_string())));
        assert_eq!(
            config.chrom_mapping.as_ref().unwrap().add_prefix,
            Some("chr".to_string())
        );
        assert_eq!(config.effective_format(), TableFormat::Tabix);
    }

    #[test]
    fn test_effective_format_guess() {
        assert_eq!(
            TableConfig::new("data.txt").effective_format(),
            TableFormat::Text
        );
        assert_eq!(
            TableConfig::new("data.txt.bgz").effective_format(),
            TableFormat::Tabix
        );
    }
}
