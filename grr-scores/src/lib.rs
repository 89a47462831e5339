//! Genomic score resources.
//!
//! Score resources pair a position table with typed score columns.
//! Flavors: `position_score` (one value per position),
//! `np_score` (one value per nucleotide substitution),
//! `allele_score` (one value per known allele) and `vcf_info`
//! (values carried in VCF INFO fields). Region queries aggregate with
//! configurable aggregators; statistics (min/max, histograms) are
//! computed per chromosome and merged.

pub mod aggregators;
pub mod allele;
pub mod config;
pub mod error;
pub mod histogram;
pub mod np;
pub mod position;
pub mod score;
pub mod statistics;
pub mod vcf_info;

pub use aggregators::{Aggregator, parse_aggregator};
pub use allele::AlleleScore;
pub use config::{
    HistogramConfig, HistogramScale, ScoreConfig, ScoreDef, ScoreType, ViewRange,
};
pub use error::{Result, ScoreError};
pub use histogram::{MinMax, NumberHistogram};
pub use np::NpScore;
pub use position::PositionScore;
pub use score::GenomicScore;
pub use statistics::{
    ScoreStatistics, chromosome_statistics, load_statistics, merge_statistics,
    save_statistics, stats_hash, statistics_up_to_date,
};
pub use vcf_info::VcfInfoScore;
