//! Genomic position tables.
//!
//! A position table is a chromosome-sorted tabular file queried by
//! closed 1-based intervals. Backends: in-memory text and
//! tabix-indexed BGZF. Chromosome names can be mapped between the
//! file's namespace and the reference genome's.

pub mod chrom_map;
pub mod config;
pub mod error;
pub mod line;
pub mod table;
pub mod tabix;
pub mod text;
pub mod write;

pub use chrom_map::ChromMap;
pub use config::{
    ChromMappingConfig, ColumnRef, HeaderMode, TableConfig, TableFormat,
};
pub use error::{Result, TableError};
pub use line::{Line, TableSchema};
pub use table::{PositionTable, open_table};
pub use tabix::TabixTable;
pub use text::TextTable;
pub use write::{TabixRow, write_tabix_table};
