//! Table lines and the resolved column schema.

use crate::config::{ColumnRef, HeaderMode, TableConfig};
use crate::error::{Result, TableError};

/// One row of a position table with its core coordinates extracted.
/// Positions are 1-based; the `[pos_begin, pos_end]` interval is
/// closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub chrom: String,
    pub pos_begin: u64,
    pub pos_end: u64,
    pub reference: Option<String>,
    pub alternative: Option<String>,
    columns: Vec<String>,
}

impl Line {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Length of the closed interval covered by the row.
    pub fn len(&self) -> u64 {
        self.pos_end - self.pos_begin + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Overlap in base pairs with a closed query interval.
    pub fn overlap(&self, pos_begin: u64, pos_end: u64) -> u64 {
        let begin = self.pos_begin.max(pos_begin);
        let end = self.pos_end.min(pos_end);
        if begin > end { 0 } else { end - begin + 1 }
    }
}

/// Column layout of a table, resolved from the configuration and the
/// header.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    header: Option<Vec<String>>,
    chrom: usize,
    pos_begin: usize,
    pos_end: usize,
    reference: Option<usize>,
    alternative: Option<usize>,
}

impl TableSchema {
    /// Resolve the schema for a table.
    ///
    /// `file_header` is the header line read from the file, already
    /// split, for `header_mode: file`; it is ignored otherwise.
    pub fn resolve(
        resource_id: &str,
        config: &TableConfig,
        file_header: Option<Vec<String>>,
    ) -> Result<TableSchema> {
        let header = match config.header_mode {
            HeaderMode::File => {
                let Some(header) = file_header else {
                    return Err(TableError::Config {
                        resource_id: resource_id.to_string(),
                        message: "header_mode is file but the file has no header"
                            .to_string(),
                    });
                };
                Some(header)
            }
            HeaderMode::List => {
                let Some(header) = config.header.clone() else {
                    return Err(TableError::Config {
                        resource_id: resource_id.to_string(),
                        message: "header_mode is list but no header is configured"
                            .to_string(),
                    });
                };
                Some(header)
            }
            HeaderMode::None => None,
        };

        let resolve_column = |reference: &Option<ColumnRef>,
                              default_names: &[&str]|
         -> Result<Option<usize>> {
            match reference {
                Some(ColumnRef::Index(index)) => Ok(Some(*index)),
                Some(ColumnRef::Name(name)) => match &header {
                    Some(header) => header
                        .iter()
                        .position(|h| h == name)
                        .map(Some)
                        .ok_or_else(|| TableError::UnknownColumn {
                            resource_id: resource_id.to_string(),
                            column: name.clone(),
                        }),
                    None => Err(TableError::Config {
                        resource_id: resource_id.to_string(),
                        message: format!(
                            "column <{}> addressed by name in a headerless table",
                            name
                        ),
                    }),
                },
                None => match &header {
                    Some(header) => Ok(default_names
                        .iter()
                        .find_map(|name| header.iter().position(|h| h == name))),
                    None => Ok(None),
                },
            }
        };

        let chrom = resolve_column(&config.chrom, &["chrom", "chr", "#chrom", "CHROM"])?;
        let pos_begin = resolve_column(
            &config.pos_begin,
            &["pos_begin", "pos", "start", "POS"],
        )?;
        let pos_end = resolve_column(&config.pos_end, &["pos_end", "stop", "end"])?;
        let reference = resolve_column(&config.reference, &["reference", "ref", "REF"])?;
        let alternative =
            resolve_column(&config.alternative, &["alternative", "alt", "ALT"])?;

        let (Some(chrom), Some(pos_begin)) = (chrom, pos_begin) else {
            return Err(TableError::Config {
                resource_id: resource_id.to_string(),
                message: "chrom and pos_begin columns could not be resolved"
                    .to_string(),
            });
        };

        Ok(TableSchema {
            header,
            chrom,
            pos_begin,
            // pos_end falls back to the pos_begin column
            pos_end: pos_end.unwrap_or(pos_begin),
            reference,
            alternative,
        })
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Index of a data column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header
            .as_ref()
            .and_then(|header| header.iter().position(|h| h == name))
    }

    /// Parse one raw tab-separated line into a [`Line`].
    pub fn parse_line(
        &self,
        filename: &str,
        line_number: u64,
        raw: &str,
    ) -> Result<Line> {
        let columns: Vec<String> = raw
            .trim_end_matches(['\n', '\r'])
            .split('\t')
            .map(str::to_string)
            .collect();
        let parse_error = |message: String| TableError::Parse {
            filename: filename.to_string(),
            line_number,
            message,
        };
        let column = |index: usize| -> Result<&str> {
            columns
                .get(index)
                .map(String::as_str)
                .ok_or_else(|| parse_error(format!("missing column {}", index)))
        };
        let chrom = column(self.chrom)?.to_string();
        let pos_begin: u64 = column(self.pos_begin)?
            .parse()
            .map_err(|_| parse_error("bad pos_begin".to_string()))?;
        let pos_end: u64 = column(self.pos_end)?
            .parse()
            .map_err(|_| parse_error("bad pos_end".to_string()))?;
        if pos_end < pos_begin {
            return Err(parse_error(format!(
                "pos_end {} before pos_begin {}",
                pos_end, pos_begin
            )));
        }
        let reference = match self.reference {
            Some(index) => Some(column(index)?.to_string()),
            None => None,
        };
        let alternative = match self.alternative {
            Some(index) => Some(column(index)?.to_string()),
            None => None,
        };
        Ok(Line {
            chrom,
            pos_begin,
            pos_end,
            reference,
            alternative,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> TableSchema {
        let config = TableConfig::new("scores.txt");
        TableSchema::resolve(
            "test",
            &config,
            Some(vec![
                "chrom".to_string(),
                "pos_begin".to_string(),
                "pos_end".to_string(),
                "phast".to_string(),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_line() {
        let line = schema()
            .parse_line("scores.txt", 2, "chr1\t10\t20\t0.5\n")
            .unwrap();
        assert_eq!(line.chrom, "chr1");
        assert_eq!(line.pos_begin, 10);
        assert_eq!(line.pos_end, 20);
        assert_eq!(line.get(3), Some("0.5"));
        assert_eq!(line.len(), 11);
    }

    #[test]
    fn test_pos_end_defaults_to_pos_begin() {
        let config = TableConfig::new("scores.txt");
        let schema = TableSchema::resolve(
            "test",
            &config,
            Some(vec![
                "chrom".to_string(),
                "pos_begin".to_string(),
                "phast".to_string(),
            ]),
        )
        .unwrap();
        let line = schema
            .parse_line("scores.txt", 2, "chr1\t10\t0.5")
            .unwrap();
        assert_eq!(line.pos_begin, 10);
        assert_eq!(line.pos_end, 10);
    }

    #[test]
    fn test_overlap() {
        let line = schema()
            .parse_line("scores.txt", 2, "chr1\t10\t20\t0.5")
            .unwrap();
        assert_eq!(line.overlap(1, 9), 0);
        assert_eq!(line.overlap(1, 10), 1);
        assert_eq!(line.overlap(15, 100), 6);
        assert_eq!(line.overlap(1, 100), 11);
    }

    #[test]
    fn test_unknown_named_column() {
        let config = TableConfig {
            chrom: Some(ColumnRef::Name("chromosome".to_string())),
            ..TableConfig::new("scores.txt")
        };
        let err = TableSchema::resolve(
            "test",
            &config,
            Some(vec!["chrom".to_string(), "pos_begin".to_string()]),
        )
        .unwrap_err();
        assert!(matches!(err, TableError::UnknownColumn { .. }));
    }

    #[test]
    fn test_headerless_requires_indexes() {
        let config = TableConfig {
            header_mode: HeaderMode::None,
            chrom: Some(ColumnRef::Index(0)),
            pos_begin: Some(ColumnRef::Index(1)),
            ..TableConfig::new("scores.txt")
        };
        let schema = TableSchema::resolve("test", &config, None).unwrap();
        let line = schema.parse_line("scores.txt", 1, "1\t42\t0.1").unwrap();
        assert_eq!(line.chrom, "1");
        assert_eq!(line.pos_begin, 42);
        assert_eq!(line.pos_end, 42);
    }

    #[test]
    fn test_rejects_inverted_interval() {
        assert!(schema().parse_line("scores.txt", 3, "chr1\t20\t10\tx").is_err());
    }
}
