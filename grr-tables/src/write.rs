//! Writing BGZF-compressed, tabix-indexed tables.
//!
//! Used by maintenance tooling and tests to produce table files the
//! indexed backend can query. Rows must already be sorted by
//! chromosome and position.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::binning_index::index::header::{Builder as HeaderBuilder, Format};
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::tabix;

use crate::error::{Result, TableError};

/// One data row to be written: coordinates for the index plus the
/// full tab-separated text of the line.
#[derive(Debug, Clone, PartialEq)]
pub struct TabixRow {
    pub chrom: String,
    pub pos_begin: u64,
    pub pos_end: u64,
    pub text: String,
}

impl TabixRow {
    pub fn new(chrom: &str, pos_begin: u64, pos_end: u64, text: &str) -> TabixRow {
        TabixRow {
            chrom: chrom.to_string(),
            pos_begin,
            pos_end,
            text: text.to_string(),
        }
    }
}

/// Write `<path>` as a BGZF file and `<path>.tbi` as its tabix index.
///
/// The index header uses the generic 1-based preset with chrom,
/// pos_begin and pos_end in the first three columns.
pub fn write_tabix_table(
    path: &Path,
    header_line: Option<&str>,
    rows: &[TabixRow],
) -> Result<()> {
    let index_error = |message: String| TableError::Index {
        filename: path.display().to_string(),
        message,
    };

    let mut writer = bgzf::Writer::new(File::create(path)?);
    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(
        HeaderBuilder::default()
            .set_format(Format::Generic(
                noodles::csi::binning_index::index::header::format::CoordinateSystem::Gff,
            ))
            .set_reference_sequence_name_index(0)
            .set_start_position_index(1)
            .set_end_position_index(Some(2))
            .set_line_comment_prefix(b'#')
            .build(),
    );

    if let Some(header_line) = header_line {
        writer.write_all(header_line.as_bytes())?;
        writer.write_all(b"\n")?;
    }

    for row in rows {
        let start_vpos = writer.virtual_position();
        writer.write_all(row.text.as_bytes())?;
        writer.write_all(b"\n")?;
        let end_vpos = writer.virtual_position();

        let start = Position::try_from(row.pos_begin as usize)
            .map_err(|err| index_error(err.to_string()))?;
        let end = Position::try_from(row.pos_end as usize)
            .map_err(|err| index_error(err.to_string()))?;
        indexer
            .add_record(&row.chrom, start, end, Chunk::new(start_vpos, end_vpos))
            .map_err(|err| index_error(err.to_string()))?;
    }

    writer.finish()?;

    let index = indexer.build();
    let mut index_path = path.as_os_str().to_owned();
    index_path.push(".tbi");
    let index_file = File::create(&index_path)?;
    tabix::io::Writer::new(index_file)
        .write_index(&index)
        .map_err(|err| index_error(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_data_and_index() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.txt.gz");
        write_tabix_table(
            &path,
            Some("#chrom\tpos_begin\tpos_end\tscore"),
            &[
                TabixRow::new("1", 10, 20, "1\t10\t20\t0.5"),
                TabixRow::new("2", 5, 5, "2\t5\t5\t0.9"),
            ],
        )
        .unwrap();
        assert!(path.is_file());
        assert!(tmp.path().join("data.txt.gz.tbi").is_file());
    }
}
