//! Publishes the parsimony-normalized form of an annotatable.

use grr_core::{Annotatable, AttributeValue};

use crate::annotator::Annotator;
use crate::attributes::{AttributeInfo, AttributeMap, empty_result};
use crate::config::AnnotatorConfig;
use crate::context::AnnotationContext;
use crate::error::Result;
use crate::liftover_annotator::resolve_annotatable_attributes;

pub const NORMALIZED_ATTRIBUTE: &str = "normalized_allele";

pub struct NormalizeAlleleAnnotator {
    annotator_id: String,
    input_annotatable: Option<String>,
    attributes: Vec<AttributeInfo>,
    is_open: bool,
}

impl NormalizeAlleleAnnotator {
    pub fn new(config: &AnnotatorConfig) -> Result<NormalizeAlleleAnnotator> {
        let attributes = resolve_annotatable_attributes(
            config,
            NORMALIZED_ATTRIBUTE,
            "the parsimony-normalized annotatable",
        )?;
        Ok(NormalizeAlleleAnnotator {
            annotator_id: config.annotator_id.clone(),
            input_annotatable: config.input_annotatable.clone(),
            attributes,
            is_open: false,
        })
    }
}

impl Annotator for NormalizeAlleleAnnotator {
    fn annotator_type(&self) -> &'static str {
        "normalize_allele_annotator"
    }

    fn annotator_id(&self) -> &str {
        &self.annotator_id
    }

    fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut [AttributeInfo] {
        &mut self.attributes
    }

    fn input_annotatable(&self) -> Option<&str> {
        self.input_annotatable.as_deref()
    }

    fn open(&mut self) -> Result<()> {
        self.is_open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let Some(annotatable) = annotatable else {
            return Ok(empty_result(&self.attributes));
        };
        let normalized = annotatable.normalized();
        Ok(self
            .attributes
            .iter()
            .map(|info| {
                (
                    info.name.clone(),
                    Some(AttributeValue::Annotatable(normalized.clone())),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalizes_vcf_allele() {
        let config = AnnotatorConfig::new("normalize_allele_annotator", 0);
        let mut annotator = NormalizeAlleleAnnotator::new(&config).unwrap();
        annotator.open().unwrap();

        let mut context = AnnotationContext::new();
        let allele = Annotatable::vcf_allele("1", 10, "CAG", "CG").unwrap();
        let result = annotator.annotate(Some(&allele), &mut context).unwrap();
        let normalized = result[NORMALIZED_ATTRIBUTE]
            .as_ref()
            .and_then(|value| value.as_annotatable().cloned());
        assert_eq!(
            normalized,
            Some(Annotatable::vcf_allele("1", 10, "CA", "C").unwrap())
        );
    }

    #[test]
    fn test_none_yields_no_value() {
        let config = AnnotatorConfig::new("normalize_allele_annotator", 0);
        let mut annotator = NormalizeAlleleAnnotator::new(&config).unwrap();
        annotator.open().unwrap();

        let mut context = AnnotationContext::new();
        let result = annotator.annotate(None, &mut context).unwrap();
        assert_eq!(result[NORMALIZED_ATTRIBUTE], None);
    }
}
