//! Annotators and the annotation pipeline.
//!
//! An [`Annotator`] produces typed attributes for an [`Annotatable`];
//! the [`AnnotationPipeline`] runs an ordered sequence of annotators
//! over one shared context, so coordinate-transforming annotators can
//! publish annotatables that later annotators consume.
//!
//! [`Annotatable`]: grr_core::Annotatable

pub mod annotator;
pub mod attributes;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod liftover_annotator;
pub mod normalize_annotator;
pub mod pipeline;
pub mod score_annotators;

pub use annotator::Annotator;
pub use attributes::{AttributeInfo, AttributeMap, AttributeType, empty_result};
pub use config::{AnnotatorConfig, AttributeConfig, parse_pipeline_str};
pub use context::AnnotationContext;
pub use error::{AnnotationError, Result};
pub use factory::{
    ANNOTATOR_TYPES, build_annotator, build_pipeline, build_pipeline_str,
};
pub use liftover_annotator::{LIFTOVER_ATTRIBUTE, LiftoverAnnotator};
pub use normalize_annotator::{NORMALIZED_ATTRIBUTE, NormalizeAlleleAnnotator};
pub use pipeline::AnnotationPipeline;
pub use score_annotators::{
    AlleleScoreAnnotator, NpScoreAnnotator, PositionScoreAnnotator, VcfInfoAnnotator,
};
