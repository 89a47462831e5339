//! The position table abstraction.

use grr_repository::Resource;

use crate::config::{TableConfig, TableFormat};
use crate::error::Result;
use crate::line::{Line, TableSchema};
use crate::tabix::TabixTable;
use crate::text::TextTable;

/// Random access to a chromosome-sorted tabular file.
///
/// All coordinates are 1-based; query intervals are closed and a row
/// matches when its closed interval overlaps the query. An unknown
/// chromosome or an uncovered interval yields an empty result, not an
/// error.
pub trait PositionTable: Send {
    fn schema(&self) -> &TableSchema;

    /// Chromosomes of the table in the query namespace.
    fn chromosomes(&self) -> Vec<String>;

    /// Rows overlapping `[pos_begin, pos_end]` on a chromosome; `None`
    /// bounds extend to the chromosome ends.
    fn fetch(
        &mut self,
        chrom: &str,
        pos_begin: Option<u64>,
        pos_end: Option<u64>,
    ) -> Result<Vec<Line>>;
}

/// Open the table of a resource with the backend its format calls for.
pub fn open_table(
    resource: &Resource,
    config: &TableConfig,
) -> Result<Box<dyn PositionTable>> {
    match config.effective_format() {
        TableFormat::Text => Ok(Box::new(TextTable::open(resource, config)?)),
        TableFormat::Tabix => Ok(Box::new(TabixTable::open(resource, config)?)),
    }
}
