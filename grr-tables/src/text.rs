//! In-memory text table backend.
//!
//! Loads the whole file up front; adequate for small tables and for
//! tests. Rows must be grouped by chromosome and sorted by position
//! within a chromosome, as in the indexed backend.

use std::io::{BufRead, BufReader};

use grr_repository::Resource;

use crate::chrom_map::ChromMap;
use crate::config::{HeaderMode, TableConfig};
use crate::error::Result;
use crate::line::{Line, TableSchema};
use crate::table::PositionTable;

pub struct TextTable {
    schema: TableSchema,
    chrom_map: ChromMap,
    lines: Vec<Line>,
    chromosomes: Vec<String>,
}

impl TextTable {
    pub fn open(resource: &Resource, config: &TableConfig) -> Result<TextTable> {
        let reader = resource.open_raw_file(&config.filename, true)?;
        let mut raw_lines = Vec::new();
        for line in BufReader::new(reader).lines() {
            raw_lines.push(line?);
        }

        let mut data_start = 0;
        let file_header = if config.header_mode == HeaderMode::File {
            // the last leading '#' line, or the first line, is the header
            while data_start + 1 < raw_lines.len()
                && raw_lines[data_start + 1].starts_with('#')
            {
                data_start += 1;
            }
            let header_line = raw_lines.get(data_start).cloned().unwrap_or_default();
            data_start += 1;
            Some(
                header_line
                    .trim_start_matches('#')
                    .split('\t')
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            while data_start < raw_lines.len() && raw_lines[data_start].starts_with('#') {
                data_start += 1;
            }
            None
        };

        let schema = TableSchema::resolve(resource.id(), config, file_header)?;

        // rows stay in the file's chromosome namespace; the map is
        // applied on queries and results
        let mut parsed = Vec::new();
        for (offset, raw) in raw_lines[data_start..].iter().enumerate() {
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            parsed.push(schema.parse_line(
                &config.filename,
                (data_start + offset + 1) as u64,
                raw,
            )?);
        }

        let chrom_map = match &config.chrom_mapping {
            Some(mapping) => {
                let mapping_file = match &mapping.filename {
                    Some(filename) => Some(resource.open_raw_file(filename, true)?),
                    None => None,
                };
                ChromMap::from_config(resource.id(), Some(mapping), mapping_file)?
            }
            None => ChromMap::auto_detect(parsed.first().map(|line| line.chrom.as_str())),
        };

        let mut lines = Vec::new();
        let mut chromosomes: Vec<String> = Vec::new();
        for line in parsed {
            let Some(chrom) = chrom_map.from_file(&line.chrom) else {
                continue;
            };
            if chromosomes.last() != Some(&chrom) {
                chromosomes.push(chrom);
            }
            lines.push(line);
        }

        Ok(TextTable {
            schema,
            chrom_map,
            lines,
            chromosomes,
        })
    }
}

impl PositionTable for TextTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn chromosomes(&self) -> Vec<String> {
        self.chromosomes.clone()
    }

    fn fetch(
        &mut self,
        chrom: &str,
        pos_begin: Option<u64>,
        pos_end: Option<u64>,
    ) -> Result<Vec<Line>> {
        let Some(file_chrom) = self.chrom_map.to_file(chrom) else {
            return Ok(Vec::new());
        };
        // results carry the canonical spelling, whichever namespace
        // the query was phrased in
        let result_chrom = self
            .chrom_map
            .from_file(&file_chrom)
            .unwrap_or_else(|| file_chrom.clone());
        let begin = pos_begin.unwrap_or(1);
        let end = pos_end.unwrap_or(u64::MAX);
        Ok(self
            .lines
            .iter()
            .filter(|line| {
                line.chrom == file_chrom
                    && line.pos_end >= begin
                    && line.pos_begin <= end
            })
            .map(|line| {
                let mut line = line.clone();
                line.chrom = result_chrom.clone();
                line
            })
            .collect())
    }
}
