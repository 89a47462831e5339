//! The annotator interface.

use grr_core::Annotatable;

use crate::attributes::{AttributeInfo, AttributeMap};
use crate::context::AnnotationContext;
use crate::error::Result;

/// Produces a set of attributes for an annotatable.
///
/// Lifecycle: constructed (configuration validated, resources
/// resolved) -> opened (file handles acquired, tables queryable) ->
/// annotating -> closed. `annotate` with `None` yields the "no value"
/// result for every declared attribute.
pub trait Annotator: Send {
    fn annotator_type(&self) -> &'static str;

    fn annotator_id(&self) -> &str;

    /// Resource this annotator reads, if any.
    fn resource_id(&self) -> Option<&str> {
        None
    }

    fn attributes(&self) -> &[AttributeInfo];

    fn attributes_mut(&mut self) -> &mut [AttributeInfo];

    /// Context attribute to annotate instead of the pipeline input.
    fn input_annotatable(&self) -> Option<&str> {
        None
    }

    fn open(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    fn close(&mut self);

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        context: &mut AnnotationContext,
    ) -> Result<AttributeMap>;
}
