//! Auxiliary genomic resources.
//!
//! Resources that are not score tables: the reference genome (FASTA
//! with a `.fai` index and optional pseudoautosomal regions), gene
//! models (refFlat-style transcript tables) and liftover chains
//! (UCSC chain files).

pub mod error;
pub mod gene_models;
pub mod genome;
pub mod liftover;

pub use error::{ResourceError, Result};
pub use gene_models::{GeneModels, GeneModelsConfig, Span, Strand, Transcript};
pub use genome::{GenomeConfig, ParsConfig, ReferenceGenome, RegionSpec};
pub use liftover::{LiftedPosition, LiftoverChain, LiftoverConfig};
