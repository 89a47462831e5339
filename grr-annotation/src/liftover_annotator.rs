//! Lifts annotatables to another genome assembly.
//!
//! The lifted annotatable is published as an internal context
//! attribute (default name `liftover_annotatable`) so that later
//! annotators can consume it through `input_annotatable`.

use grr_core::{Annotatable, AttributeValue, VcfAllele};
use grr_repository::Resource;
use grr_resources::LiftoverChain;

use crate::annotator::Annotator;
use crate::attributes::{AttributeInfo, AttributeMap, AttributeType, empty_result};
use crate::config::AnnotatorConfig;
use crate::context::AnnotationContext;
use crate::error::{AnnotationError, Result};

pub const LIFTOVER_ATTRIBUTE: &str = "liftover_annotatable";

pub struct LiftoverAnnotator {
    annotator_id: String,
    resource: Resource,
    input_annotatable: Option<String>,
    attributes: Vec<AttributeInfo>,
    chain: Option<LiftoverChain>,
}

impl LiftoverAnnotator {
    pub fn new(resource: Resource, config: &AnnotatorConfig) -> Result<LiftoverAnnotator> {
        if resource.resource_type() != "liftover_chain" {
            return Err(AnnotationError::Config {
                annotator_id: config.annotator_id.clone(),
                message: format!(
                    "resource <{}> has type <{}>, expected <liftover_chain>",
                    resource.id(),
                    resource.resource_type()
                ),
            });
        }

        let attributes = resolve_annotatable_attributes(
            config,
            LIFTOVER_ATTRIBUTE,
            "the annotatable lifted to the target assembly",
        )?;
        Ok(LiftoverAnnotator {
            annotator_id: config.annotator_id.clone(),
            resource,
            input_annotatable: config.input_annotatable.clone(),
            attributes,
            chain: None,
        })
    }

    fn lift(&self, chain: &LiftoverChain, annotatable: &Annotatable) -> Option<Annotatable> {
        match annotatable {
            Annotatable::Position { chrom, pos } => {
                let lifted = chain.map_position(chrom, *pos)?;
                Some(Annotatable::Position {
                    chrom: lifted.chrom,
                    pos: lifted.pos,
                })
            }
            Annotatable::Region { chrom, pos, pos_end } => {
                let begin = chain.map_position(chrom, *pos)?;
                let end = chain.map_position(chrom, *pos_end)?;
                if begin.chrom != end.chrom {
                    return None;
                }
                Annotatable::region(
                    begin.chrom,
                    begin.pos.min(end.pos),
                    begin.pos.max(end.pos),
                )
                .ok()
            }
            Annotatable::VcfAllele(allele) => {
                let lifted = chain.map_position(&allele.chrom, allele.pos)?;
                let (pos, reference, alternative) = if lifted.reverse_strand {
                    // on the minus strand the interval start maps from
                    // the original end
                    let end = chain.map_position(&allele.chrom, allele.pos_end())?;
                    if end.chrom != lifted.chrom {
                        return None;
                    }
                    (
                        lifted.pos.min(end.pos),
                        reverse_complement(&allele.reference)?,
                        reverse_complement(&allele.alternative)?,
                    )
                } else {
                    (
                        lifted.pos,
                        allele.reference.clone(),
                        allele.alternative.clone(),
                    )
                };
                Some(Annotatable::VcfAllele(VcfAllele {
                    chrom: lifted.chrom,
                    pos,
                    reference,
                    alternative,
                }))
            }
            Annotatable::CnvAllele(cnv) => {
                let begin = chain.map_position(&cnv.chrom, cnv.pos)?;
                let end = chain.map_position(&cnv.chrom, cnv.pos_end)?;
                if begin.chrom != end.chrom {
                    return None;
                }
                Annotatable::cnv_allele(
                    begin.chrom,
                    begin.pos.min(end.pos),
                    begin.pos.max(end.pos),
                    cnv.kind,
                )
                .ok()
            }
        }
    }
}

fn reverse_complement(sequence: &str) -> Option<String> {
    sequence
        .bytes()
        .rev()
        .map(|base| match base.to_ascii_uppercase() {
            b'A' => Some('T'),
            b'C' => Some('G'),
            b'G' => Some('C'),
            b'T' => Some('A'),
            b'N' => Some('N'),
            _ => None,
        })
        .collect()
}

/// Attributes of an annotator whose single source is a context
/// annotatable; without explicit configuration one internal attribute
/// under the default name.
pub(crate) fn resolve_annotatable_attributes(
    config: &AnnotatorConfig,
    default_name: &str,
    description: &str,
) -> Result<Vec<AttributeInfo>> {
    if config.attributes.is_empty() {
        return Ok(vec![AttributeInfo {
            name: default_name.to_string(),
            source: default_name.to_string(),
            value_type: AttributeType::Annotatable,
            internal: true,
            description: description.to_string(),
        }]);
    }
    config
        .attributes
        .iter()
        .map(|attribute| {
            let source = attribute.resolved_source().unwrap_or_default();
            if source != default_name {
                return Err(AnnotationError::Config {
                    annotator_id: config.annotator_id.clone(),
                    message: format!(
                        "unknown attribute source <{}>; only <{}> is available",
                        source, default_name
                    ),
                });
            }
            Ok(AttributeInfo {
                name: attribute.resolved_name().unwrap_or_default().to_string(),
                source: source.to_string(),
                value_type: AttributeType::Annotatable,
                internal: attribute.internal,
                description: description.to_string(),
            })
        })
        .collect()
}

impl Annotator for LiftoverAnnotator {
    fn annotator_type(&self) -> &'static str {
        "liftover_annotator"
    }

    fn annotator_id(&self) -> &str {
        &self.annotator_id
    }

    fn resource_id(&self) -> Option<&str> {
        Some(self.resource.id())
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
        if self.chain.is_none() {
            self.chain = Some(LiftoverChain::open(&self.resource)?);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.chain.is_some()
    }

    fn close(&mut self) {
        self.chain = None;
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let chain = self.chain.as_ref().ok_or_else(|| AnnotationError::Config {
            annotator_id: self.annotator_id.clone(),
            message: "annotator is not open".to_string(),
        })?;
        let Some(annotatable) = annotatable else {
            return Ok(empty_result(&self.attributes));
        };

        let lifted = self.lift(chain, annotatable);
        if lifted.is_none() {
            tracing::debug!(%annotatable, "annotatable is not liftable");
        }
        Ok(self
            .attributes
            .iter()
            .map(|info| {
                (
                    info.name.clone(),
                    lifted.clone().map(AttributeValue::Annotatable),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use grr_repository::build_inmemory_repository;

    const CONFIG: &str = "type: liftover_chain\nfilename: lift.chain\n";

    const CHAIN: &str = "\
chain 100 1 1000 + 100 200 chr1 2000 + 600 700 1
100

chain 90 2 50 + 0 50 chr2 400 - 100 150 2
50
";

    fn annotator() -> LiftoverAnnotator {
        let mut files = BTreeMap::new();
        files.insert(
            "lift/genomic_resource.yaml".to_string(),
            CONFIG.as_bytes().to_vec(),
        );
        files.insert("lift/lift.chain".to_string(), CHAIN.as_bytes().to_vec());
        let resource = build_inmemory_repository("demo", files)
            .get_resource("lift", None)
            .unwrap();
        let config = AnnotatorConfig::new("liftover_annotator", 0);
        let mut annotator = LiftoverAnnotator::new(resource, &config).unwrap();
        annotator.open().unwrap();
        annotator
    }

    fn lifted(result: &AttributeMap) -> Option<Annotatable> {
        result[LIFTOVER_ATTRIBUTE]
            .as_ref()
            .and_then(|value| value.as_annotatable().cloned())
    }

    #[test]
    fn test_default_attribute_is_internal() {
        let annotator = annotator();
        assert_eq!(annotator.attributes().len(), 1);
        assert!(annotator.attributes()[0].internal);
        assert_eq!(
            annotator.attributes()[0].value_type,
            AttributeType::Annotatable
        );
    }

    #[test]
    fn test_lift_substitution() {
        let mut annotator = annotator();
        let mut context = AnnotationContext::new();
        let allele = Annotatable::vcf_allele("1", 150, "A", "G").unwrap();
        let result = annotator.annotate(Some(&allele), &mut context).unwrap();
        assert_eq!(
            lifted(&result),
            Some(Annotatable::vcf_allele("chr1", 650, "A", "G").unwrap())
        );
    }

    #[test]
    fn test_lift_reverse_strand_complements_alleles() {
        let mut annotator = annotator();
        let mut context = AnnotationContext::new();
        // chain 2 maps [1, 50] onto chr2 minus strand
        let allele = Annotatable::vcf_allele("2", 10, "A", "C").unwrap();
        let result = annotator.annotate(Some(&allele), &mut context).unwrap();
        // q offset 109, flipped: 400 - 1 - 109 = 290 -> 1-based 291
        assert_eq!(
            lifted(&result),
            Some(Annotatable::vcf_allele("chr2", 291, "T", "G").unwrap())
        );
    }

    #[test]
    fn test_unmappable_position_yields_no_value() {
        let mut annotator = annotator();
        let mut context = AnnotationContext::new();
        let position = Annotatable::position("1", 50);
        let result = annotator.annotate(Some(&position), &mut context).unwrap();
        assert_eq!(result[LIFTOVER_ATTRIBUTE], None);
    }

    #[test]
    fn test_lift_region() {
        let mut annotator = annotator();
        let mut context = AnnotationContext::new();
        let region = Annotatable::region("1", 120, 130).unwrap();
        let result = annotator.annotate(Some(&region), &mut context).unwrap();
        assert_eq!(
            lifted(&result),
            Some(Annotatable::region("chr1", 620, 630).unwrap())
        );
    }
}
