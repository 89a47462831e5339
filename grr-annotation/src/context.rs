//! The mutable context threaded through a pipeline run.

use std::collections::HashMap;

use grr_core::{Annotatable, AttributeValue};

/// Attribute values accumulated while annotating one annotatable.
///
/// Every annotator's output lands here, internal attributes included,
/// so later annotators can consume what earlier ones published.
#[derive(Debug, Default)]
pub struct AnnotationContext {
    values: HashMap<String, Option<AttributeValue>>,
}

impl AnnotationContext {
    pub fn new() -> AnnotationContext {
        AnnotationContext::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<AttributeValue>) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Option<AttributeValue>> {
        self.values.get(name)
    }

    /// An annotatable published under `name`; `None` when the key is
    /// absent, holds no value, or holds a value of another type.
    pub fn get_annotatable(&self, name: &str) -> Option<&Annotatable> {
        match self.values.get(name) {
            Some(Some(value)) => {
                let annotatable = value.as_annotatable();
                if annotatable.is_none() {
                    tracing::warn!(
                        attribute = name,
                        "context attribute does not hold an annotatable"
                    );
                }
                annotatable
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_annotatable() {
        let mut context = AnnotationContext::new();
        let annotatable = Annotatable::position("chr1", 100);
        context.set(
            "lifted",
            Some(AttributeValue::Annotatable(annotatable.clone())),
        );
        context.set("score", Some(AttributeValue::Float(0.5)));
        context.set("missing", None);

        assert_eq!(context.get_annotatable("lifted"), Some(&annotatable));
        assert_eq!(context.get_annotatable("score"), None);
        assert_eq!(context.get_annotatable("missing"), None);
        assert_eq!(context.get_annotatable("absent"), None);
    }
}
