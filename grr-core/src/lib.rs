//! Core primitives shared by the grr workspace: the typed annotatable
//! coordinate model, attribute values produced by annotation, and small
//! I/O helpers.

pub mod annotatable;
pub mod errors;
pub mod utils;
pub mod value;

pub use annotatable::{Annotatable, CnvKind, VariantKind, VcfAllele};
pub use errors::CoreError;
pub use value::AttributeValue;
