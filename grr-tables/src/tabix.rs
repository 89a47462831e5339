//! Tabix/BGZF indexed table backend.
//!
//! Queries go through the `.tbi` binning index: overlapping chunks are
//! coalesced, each chunk is entered at its virtual position and rows
//! are filtered against the closed query interval.

use std::io::BufRead;

use noodles::bgzf;
use noodles::core::Position;
use noodles::core::region::Interval;
use noodles::csi::BinningIndex;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::tabix;

use grr_repository::{ReadSeek, Resource};

use crate::chrom_map::ChromMap;
use crate::config::{HeaderMode, TableConfig};
use crate::error::{Result, TableError};
use crate::line::{Line, TableSchema};
use crate::table::PositionTable;

pub struct TabixTable {
    filename: String,
    schema: TableSchema,
    chrom_map: ChromMap,
    index: tabix::Index,
    file_chromosomes: Vec<String>,
    reader: bgzf::Reader<Box<dyn ReadSeek>>,
}

impl TabixTable {
    pub fn open(resource: &Resource, config: &TableConfig) -> Result<TabixTable> {
        let index_filename = format!("{}.tbi", config.filename);
        let index = tabix::io::Reader::new(
            resource.open_raw_file(&index_filename, false)?,
        )
        .read_index()
        .map_err(|err| TableError::Index {
            filename: index_filename.clone(),
            message: err.to_string(),
        })?;

        let file_chromosomes: Vec<String> = match index.header() {
            Some(header) => header
                .reference_sequence_names()
                .iter()
                .map(|name| String::from_utf8_lossy(name.as_ref()).into_owned())
                .collect(),
            None => {
                return Err(TableError::Index {
                    filename: index_filename,
                    message: "index carries no tabix header".to_string(),
                });
            }
        };

        let file_header = if config.header_mode == HeaderMode::File {
            Some(Self::read_file_header(resource, &config.filename)?)
        } else {
            None
        };
        let schema = TableSchema::resolve(resource.id(), config, file_header)?;

        let chrom_map = match &config.chrom_mapping {
            Some(mapping) => {
                let mapping_file = match &mapping.filename {
                    Some(filename) => Some(resource.open_raw_file(filename, true)?),
                    None => None,
                };
                ChromMap::from_config(resource.id(), Some(mapping), mapping_file)?
            }
            None => ChromMap::auto_detect(file_chromosomes.first().map(String::as_str)),
        };

        let reader = bgzf::Reader::new(resource.open_seekable_file(&config.filename)?);

        Ok(TabixTable {
            filename: config.filename.clone(),
            schema,
            chrom_map,
            index,
            file_chromosomes,
            reader,
        })
    }

    /// Header line of the data file: the last leading `#` line, with
    /// the `#` stripped.
    fn read_file_header(resource: &Resource, filename: &str) -> Result<Vec<String>> {
        let mut reader = bgzf::Reader::new(resource.open_seekable_file(filename)?);
        let mut header_line: Option<String> = None;
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if !line.starts_with('#') {
                if header_line.is_none() {
                    header_line = Some(line.clone());
                }
                break;
            }
            header_line = Some(line.clone());
        }
        let Some(header_line) = header_line else {
            return Err(TableError::Config {
                resource_id: resource.id().to_string(),
                message: format!("table file <{}> is empty", filename),
            });
        };
        Ok(header_line
            .trim_start_matches('#')
            .trim_end_matches(['\n', '\r'])
            .split('\t')
            .map(str::to_string)
            .collect())
    }

    fn query_chunks(&self, file_chrom: &str, begin: u64, end: u64) -> Result<Vec<Chunk>> {
        let Some(reference_sequence_id) = self
            .file_chromosomes
            .iter()
            .position(|name| name == file_chrom)
        else {
            return Ok(Vec::new());
        };
        let start = Position::try_from(begin.max(1) as usize)
            .unwrap_or(Position::MIN);
        let stop = Position::try_from(end.min(usize::MAX as u64) as usize)
            .unwrap_or(Position::MAX);
        let interval = Interval::from(start..=stop);
        let mut chunks = self
            .index
            .query(reference_sequence_id, interval)
            .map_err(|err| TableError::Index {
                filename: self.filename.clone(),
                message: err.to_string(),
            })?;
        chunks.sort_by_key(|chunk| chunk.start());
        // coalesce overlapping chunks so no row is visited twice
        let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match merged.last_mut() {
                Some(last) if chunk.start() <= last.end() => {
                    *last = Chunk::new(last.start(), last.end().max(chunk.end()));
                }
                _ => merged.push(chunk),
            }
        }
        Ok(merged)
    }
}

impl PositionTable for TabixTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn chromosomes(&self) -> Vec<String> {
        self.file_chromosomes
            .iter()
            .filter_map(|chrom| self.chrom_map.from_file(chrom))
            .collect()
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
        let chunks = self.query_chunks(&file_chrom, begin, end)?;

        let mut lines = Vec::new();
        let mut raw = String::new();
        'chunks: for chunk in chunks {
            self.reader.seek(chunk.start())?;
            loop {
                if self.reader.virtual_position() >= chunk.end() {
                    break;
                }
                raw.clear();
                if self.reader.read_line(&mut raw)? == 0 {
                    break;
                }
                if raw.starts_with('#') || raw.trim().is_empty() {
                    continue;
                }
                let line = self.schema.parse_line(&self.filename, 0, &raw)?;
                if line.chrom != file_chrom {
                    continue;
                }
                if line.pos_begin > end {
                    // rows are position sorted within a chromosome
                    break 'chunks;
                }
                if line.pos_end < begin {
                    continue;
                }
                let mut line = line;
                line.chrom = result_chrom.clone();
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use grr_repository::{DirectoryProtocol, Repository, RepositoryProtocol};

    use crate::write::{TabixRow, write_tabix_table};

    fn demo_resource(tmp: &TempDir, config_yaml: &str, rows: &[TabixRow]) -> Resource {
        let dir = tmp.path().join("scores");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("genomic_resource.yaml"), config_yaml).unwrap();
        write_tabix_table(
            &dir.join("data.txt.gz"),
            Some("#chrom\tpos_begin\tpos_end\tscore"),
            rows,
        )
        .unwrap();
        let proto = DirectoryProtocol::new("demo", tmp.path());
        Repository::new(std::sync::Arc::new(proto))
            .get_resource("scores", None)
            .unwrap()
    }

    fn demo_rows() -> Vec<TabixRow> {
        vec![
            TabixRow::new("1", 10, 20, "1\t10\t20\t0.5"),
            TabixRow::new("1", 21, 30, "1\t21\t30\t0.7"),
            TabixRow::new("2", 5, 5, "2\t5\t5\t0.9"),
        ]
    }

    #[test]
    fn test_indexed_fetch() {
        let tmp = TempDir::new().unwrap();
        let resource = demo_resource(&tmp, "type: position_score\n", &demo_rows());
        let mut table =
            TabixTable::open(&resource, &TableConfig::new("data.txt.gz")).unwrap();

        assert_eq!(table.chromosomes(), vec!["1", "2"]);

        let lines = table.fetch("1", Some(15), Some(25)).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].pos_begin, 10);
        assert_eq!(lines[1].pos_begin, 21);

        let lines = table.fetch("2", None, None).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].get(3), Some("0.9"));

        assert!(table.fetch("1", Some(31), Some(40)).unwrap().is_empty());
        assert!(table.fetch("17", Some(1), Some(10)).unwrap().is_empty());
    }

    #[test]
    fn test_matches_text_backend() {
        let tmp = TempDir::new().unwrap();
        let resource = demo_resource(&tmp, "type: position_score\n", &demo_rows());
        let mut indexed =
            TabixTable::open(&resource, &TableConfig::new("data.txt.gz")).unwrap();

        let text = "#chrom\tpos_begin\tpos_end\tscore\n\
                    1\t10\t20\t0.5\n1\t21\t30\t0.7\n2\t5\t5\t0.9\n";
        let tmp2 = TempDir::new().unwrap();
        let dir = tmp2.path().join("scores");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("genomic_resource.yaml"), "type: position_score\n").unwrap();
        fs::write(dir.join("data.txt"), text).unwrap();
        let resource = Repository::new(std::sync::Arc::new(DirectoryProtocol::new(
            "demo2",
            tmp2.path(),
        )))
        .get_resource("scores", None)
        .unwrap();
        let mut plain =
            crate::text::TextTable::open(&resource, &TableConfig::new("data.txt"))
                .unwrap();

        for (begin, end) in [(1, 9), (10, 10), (15, 25), (1, 1000)] {
            let from_indexed = indexed.fetch("1", Some(begin), Some(end)).unwrap();
            let from_text = plain.fetch("1", Some(begin), Some(end)).unwrap();
            assert_eq!(from_indexed, from_text, "interval {}-{}", begin, end);
        }
    }

    #[test]
    fn test_prefix_variance_resolved_at_open() {
        let tmp = TempDir::new().unwrap();
        let rows = vec![
            TabixRow::new("chr1", 10, 20, "chr1\t10\t20\t0.5"),
            TabixRow::new("chr2", 5, 5, "chr2\t5\t5\t0.9"),
        ];
        let resource = demo_resource(&tmp, "type: position_score\n", &rows);
        let mut table =
            TabixTable::open(&resource, &TableConfig::new("data.txt.gz")).unwrap();

        let with_prefix = table.fetch("chr1", Some(10), Some(20)).unwrap();
        let without_prefix = table.fetch("1", Some(10), Some(20)).unwrap();
        assert_eq!(with_prefix.len(), 1);
        assert_eq!(with_prefix, without_prefix);
        assert_eq!(with_prefix[0].chrom, "chr1");

        // bare file namespace accepts prefixed queries the same way
        let tmp = TempDir::new().unwrap();
        let resource = demo_resource(&tmp, "type: position_score\n", &demo_rows());
        let mut table =
            TabixTable::open(&resource, &TableConfig::new("data.txt.gz")).unwrap();
        assert_eq!(
            table.fetch("chr1", Some(10), Some(20)).unwrap(),
            table.fetch("1", Some(10), Some(20)).unwrap()
        );
        assert_eq!(table.fetch("1", Some(10), Some(20)).unwrap().len(), 1);
    }

    #[test]
    fn test_chrom_mapping() {
        let tmp = TempDir::new().unwrap();
        let resource = demo_resource(&tmp, "type: position_score\n", &demo_rows());
        let config: TableConfig = serde_yaml::from_str(
            "filename: data.txt.gz\nchrom_mapping:\n  add_prefix: chr\n",
        )
        .unwrap();
        let mut table = TabixTable::open(&resource, &config).unwrap();
        assert_eq!(table.chromosomes(), vec!["chr1", "chr2"]);
        let lines = table.fetch("chr2", Some(5), Some(5)).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].chrom, "chr2");
    }
}
