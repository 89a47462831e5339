//! The annotation pipeline: an ordered sequence of annotators sharing
//! one annotation context.

use std::fmt::Write as _;

use grr_core::Annotatable;

use crate::annotator::Annotator;
use crate::attributes::{AttributeInfo, AttributeMap};
use crate::context::AnnotationContext;
use crate::error::Result;

pub struct AnnotationPipeline {
    annotators: Vec<Box<dyn Annotator>>,
    is_open: bool,
}

impl std::fmt::Debug for AnnotationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationPipeline")
            .field(
                "annotators",
                &self
                    .annotators
                    .iter()
                    .map(|annotator| annotator.annotator_id())
                    .collect::<Vec<_>>(),
            )
            .field("is_open", &self.is_open)
            .finish()
    }
}

impl AnnotationPipeline {
    pub fn new(annotators: Vec<Box<dyn Annotator>>) -> AnnotationPipeline {
        AnnotationPipeline {
            annotators,
            is_open: false,
        }
    }

    pub fn annotators(&self) -> &[Box<dyn Annotator>] {
        &self.annotators
    }

    pub(crate) fn annotators_mut(&mut self) -> &mut Vec<Box<dyn Annotator>> {
        &mut self.annotators
    }

    /// All declared attributes, in annotator order.
    pub fn attributes(&self) -> Vec<&AttributeInfo> {
        self.annotators
            .iter()
            .flat_map(|annotator| annotator.attributes().iter())
            .collect()
    }

    /// The pipeline-visible output attributes.
    pub fn visible_attributes(&self) -> Vec<&AttributeInfo> {
        self.attributes()
            .into_iter()
            .filter(|info| !info.internal)
            .collect()
    }

    pub fn attribute_info(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes().into_iter().find(|info| info.name == name)
    }

    /// Open every annotator. Opening an open pipeline is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open {
            return Ok(());
        }
        for annotator in &mut self.annotators {
            annotator.open()?;
        }
        self.is_open = true;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn close(&mut self) {
        for annotator in &mut self.annotators {
            annotator.close();
        }
        self.is_open = false;
    }

    /// Annotate one annotatable, returning the visible attributes.
    ///
    /// The pipeline opens itself if needed. Each annotator's output is
    /// merged into the shared context; an annotator configured with
    /// `input_annotatable` receives the annotatable published there by
    /// an earlier annotator instead of the pipeline input.
    pub fn annotate(&mut self, annotatable: Option<&Annotatable>) -> Result<AttributeMap> {
        let mut context = AnnotationContext::new();
        self.annotate_with_context(annotatable, &mut context)
    }

    pub fn annotate_with_context(
        &mut self,
        annotatable: Option<&Annotatable>,
        context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        if !self.is_open {
            self.open()?;
        }

        let mut result = AttributeMap::new();
        for annotator in &mut self.annotators {
            let published;
            let input = match annotator.input_annotatable() {
                Some(name) => {
                    published = context.get_annotatable(name).cloned();
                    published.as_ref()
                }
                None => annotatable,
            };
            let attributes = annotator.annotate(input, context)?;
            for info in annotator.attributes() {
                let value = attributes.get(&info.name).cloned().flatten();
                context.set(info.name.clone(), value.clone());
                if !info.internal {
                    result.insert(info.name.clone(), value);
                }
            }
        }
        Ok(result)
    }

    /// Plain-text description of the annotators and their attributes.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for annotator in &self.annotators {
            let _ = write!(out, "{} {}", annotator.annotator_id(), annotator.annotator_type());
            if let Some(resource_id) = annotator.resource_id() {
                let _ = write!(out, " <{}>", resource_id);
            }
            out.push('\n');
            for info in annotator.attributes() {
                let _ = write!(out, "  {} ({})", info.name, info.value_type);
                if info.internal {
                    out.push_str(" [internal]");
                }
                if info.source != info.name {
                    let _ = write!(out, " source: {}", info.source);
                }
                if !info.description.is_empty() {
                    let _ = write!(out, " - {}", info.description);
                }
                out.push('\n');
            }
        }
        out
    }
}
