//! Builds annotators and pipelines from configuration.

use std::collections::{BTreeSet, HashMap, HashSet};

use grr_repository::GroupRepository;

use crate::annotator::Annotator;
use crate::attributes::AttributeType;
use crate::config::{AnnotatorConfig, parse_pipeline_str};
use crate::error::{AnnotationError, Result};
use crate::liftover_annotator::LiftoverAnnotator;
use crate::normalize_annotator::NormalizeAlleleAnnotator;
use crate::pipeline::AnnotationPipeline;
use crate::score_annotators::{
    AlleleScoreAnnotator, NpScoreAnnotator, PositionScoreAnnotator, VcfInfoAnnotator,
};

pub const ANNOTATOR_TYPES: &[&str] = &[
    "position_score",
    "np_score",
    "allele_score",
    "vcf_info",
    "liftover_annotator",
    "normalize_allele_annotator",
];

/// Construct one annotator from its configuration, resolving the
/// resource it needs. A missing resource is fatal here.
pub fn build_annotator(
    repository: &GroupRepository,
    config: &AnnotatorConfig,
) -> Result<Box<dyn Annotator>> {
    match config.annotator_type.as_str() {
        "position_score" => {
            let resource = repository.get_resource(config.require_resource_id()?, None)?;
            Ok(Box::new(PositionScoreAnnotator::new(resource, config)?))
        }
        "np_score" => {
            let resource = repository.get_resource(config.require_resource_id()?, None)?;
            Ok(Box::new(NpScoreAnnotator::new(resource, config)?))
        }
        "allele_score" => {
            let resource = repository.get_resource(config.require_resource_id()?, None)?;
            Ok(Box::new(AlleleScoreAnnotator::new(resource, config)?))
        }
        "vcf_info" => {
            let resource = repository.get_resource(config.require_resource_id()?, None)?;
            Ok(Box::new(VcfInfoAnnotator::new(resource, config)?))
        }
        "liftover_annotator" => {
            let resource = repository.get_resource(config.require_resource_id()?, None)?;
            Ok(Box::new(LiftoverAnnotator::new(resource, config)?))
        }
        "normalize_allele_annotator" => {
            Ok(Box::new(NormalizeAlleleAnnotator::new(config)?))
        }
        _ => Err(AnnotationError::UnknownAnnotatorType {
            annotator_id: config.annotator_id.clone(),
            annotator_type: config.annotator_type.clone(),
        }),
    }
}

/// Build an annotation pipeline from parsed annotator configurations.
///
/// Visible attribute names must be unique across the pipeline unless
/// `allow_repeated_attributes` is set, in which case repeats are
/// renamed to `{name}_({annotator id})`.
pub fn build_pipeline(
    repository: &GroupRepository,
    configs: &[AnnotatorConfig],
    allow_repeated_attributes: bool,
) -> Result<AnnotationPipeline> {
    let mut annotators = Vec::with_capacity(configs.len());
    for config in configs {
        let annotator = build_annotator(repository, config)?;
        check_annotator_attributes(config, annotator.as_ref())?;
        check_input_annotatable(&annotators, annotator.as_ref())?;
        annotators.push(annotator);
    }

    let mut pipeline = AnnotationPipeline::new(annotators);
    check_pipeline_attributes(&mut pipeline, allow_repeated_attributes)?;
    Ok(pipeline)
}

/// Parse a pipeline configuration string and build the pipeline.
pub fn build_pipeline_str(
    repository: &GroupRepository,
    content: &str,
    allow_repeated_attributes: bool,
) -> Result<AnnotationPipeline> {
    let configs = parse_pipeline_str(content)?;
    build_pipeline(repository, &configs, allow_repeated_attributes)
}

fn check_annotator_attributes(
    config: &AnnotatorConfig,
    annotator: &dyn Annotator,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut repeated = BTreeSet::new();
    for info in annotator.attributes() {
        if !seen.insert(info.name.as_str()) {
            repeated.insert(info.name.clone());
        }
    }
    if repeated.is_empty() {
        return Ok(());
    }
    Err(AnnotationError::Config {
        annotator_id: config.annotator_id.clone(),
        message: format!(
            "the annotator has repeated attributes: {}",
            repeated.into_iter().collect::<Vec<_>>().join(",")
        ),
    })
}

/// `input_annotatable` must reference an annotatable-typed attribute
/// declared by an earlier annotator.
fn check_input_annotatable(
    earlier: &[Box<dyn Annotator>],
    annotator: &dyn Annotator,
) -> Result<()> {
    let Some(name) = annotator.input_annotatable() else {
        return Ok(());
    };
    let declared = earlier
        .iter()
        .flat_map(|a| a.attributes().iter())
        .find(|info| info.name == name);
    match declared {
        Some(info) if info.value_type == AttributeType::Annotatable => Ok(()),
        Some(info) => Err(AnnotationError::Config {
            annotator_id: annotator.annotator_id().to_string(),
            message: format!(
                "the attribute <{}> has type <{}>, expected <annotatable>",
                name, info.value_type
            ),
        }),
        None => {
            let available = earlier
                .iter()
                .flat_map(|a| a.attributes().iter())
                .map(|info| format!("<{}> [{}]", info.name, info.value_type))
                .collect::<Vec<_>>()
                .join(",");
            Err(AnnotationError::Config {
                annotator_id: annotator.annotator_id().to_string(),
                message: format!(
                    "the attribute <{}> has not been defined before its use; \
                     available attributes: {}",
                    name, available
                ),
            })
        }
    }
}

fn check_pipeline_attributes(
    pipeline: &mut AnnotationPipeline,
    allow_repeated_attributes: bool,
) -> Result<()> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for info in pipeline.visible_attributes() {
        *counts.entry(info.name.clone()).or_default() += 1;
    }
    let repeated: BTreeSet<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    if repeated.is_empty() {
        return Ok(());
    }
    if !allow_repeated_attributes {
        return Err(AnnotationError::DuplicateAttributes(
            repeated.into_iter().collect::<Vec<_>>().join(","),
        ));
    }

    for annotator in pipeline.annotators_mut() {
        let annotator_id = annotator.annotator_id().to_string();
        for info in annotator.attributes_mut() {
            if repeated.contains(&info.name) && !info.internal {
                info.name = format!("{}_({})", info.name, annotator_id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use grr_core::{Annotatable, AttributeValue};
    use grr_repository::{Repository, build_inmemory_repository};

    const SCORE_CONFIG: &str = r"
type: position_score
table:
  filename: data.txt
scores:
- id: s1
  type: float
  desc: conservation score
";

    const SCORE_TABLE: &str = "\
chrom\tpos_begin\tpos_end\ts1
chr1\t23\t23\t0.01
chr1\t24\t24\t0.2
";

    const NP_CONFIG: &str = r"
type: np_score
table:
  filename: np.txt
scores:
- id: n1
  type: float
";

    const NP_TABLE: &str = "\
chrom\tpos_begin\tpos_end\treference\talternative\tn1
chr1\t23\t23\tA\tC\t0.1
chr1\t23\t23\tA\tG\t0.4
";

    fn repository() -> GroupRepository {
        let mut files = BTreeMap::new();
        files.insert(
            "scores/one/genomic_resource.yaml".to_string(),
            SCORE_CONFIG.as_bytes().to_vec(),
        );
        files.insert(
            "scores/one/data.txt".to_string(),
            SCORE_TABLE.as_bytes().to_vec(),
        );
        files.insert(
            "scores/np/genomic_resource.yaml".to_string(),
            NP_CONFIG.as_bytes().to_vec(),
        );
        files.insert(
            "scores/np/np.txt".to_string(),
            NP_TABLE.as_bytes().to_vec(),
        );
        let repository: Repository = build_inmemory_repository("demo", files);
        GroupRepository::new(vec![repository])
    }

    #[test]
    fn test_single_annotator_pipeline() {
        let mut pipeline = build_pipeline_str(
            &repository(),
            r"
- position_score:
    resource_id: scores/one
    attributes:
    - source: s1
      name: score
",
            false,
        )
        .unwrap();

        let result = pipeline
            .annotate(Some(&Annotatable::position("chr1", 23)))
            .unwrap();
        assert_eq!(result["score"], Some(AttributeValue::Float(0.01)));

        let missed = pipeline
            .annotate(Some(&Annotatable::position("chr1", 25)))
            .unwrap();
        assert_eq!(missed["score"], None);
    }

    #[test]
    fn test_default_attributes_expose_all_scores() {
        let mut pipeline =
            build_pipeline_str(&repository(), "- position_score: scores/one\n", false)
                .unwrap();
        let result = pipeline
            .annotate(Some(&Annotatable::position("chr1", 24)))
            .unwrap();
        assert_eq!(result["s1"], Some(AttributeValue::Float(0.2)));
    }

    #[test]
    fn test_unknown_chromosome_yields_no_value() {
        let mut pipeline =
            build_pipeline_str(&repository(), "- position_score: scores/one\n", false)
                .unwrap();
        let result = pipeline
            .annotate(Some(&Annotatable::position("chrX", 23)))
            .unwrap();
        assert_eq!(result["s1"], None);
    }

    #[test]
    fn test_duplicate_attributes_rejected_at_build() {
        let config = r"
- position_score: scores/one
- position_score: scores/one
";
        let error = build_pipeline_str(&repository(), config, false).unwrap_err();
        assert!(matches!(error, AnnotationError::DuplicateAttributes(_)));
    }

    #[test]
    fn test_repeated_attributes_renamed_when_allowed() {
        let config = r"
- position_score: scores/one
- position_score: scores/one
";
        let pipeline = build_pipeline_str(&repository(), config, true).unwrap();
        let names: Vec<&str> = pipeline
            .visible_attributes()
            .iter()
            .map(|info| info.name.as_str())
            .collect();
        assert_eq!(names, vec!["s1_(A0)", "s1_(A1)"]);
    }

    #[test]
    fn test_missing_resource_is_fatal() {
        let error =
            build_pipeline_str(&repository(), "- position_score: scores/nope\n", false)
                .unwrap_err();
        assert!(matches!(error, AnnotationError::Repository(_)));
    }

    #[test]
    fn test_input_annotatable_must_be_declared_earlier() {
        let config = r"
- np_score:
    resource_id: scores/np
    input_annotatable: normalized_allele
";
        let error = build_pipeline_str(&repository(), config, false).unwrap_err();
        assert!(matches!(error, AnnotationError::Config { .. }));
    }

    #[test]
    fn test_normalized_allele_feeds_np_score() {
        let config = r"
- normalize_allele_annotator
- np_score:
    resource_id: scores/np
    input_annotatable: normalized_allele
";
        let mut pipeline = build_pipeline_str(&repository(), config, false).unwrap();
        // untrimmed allele; the normalized form is chr1:23 A>G
        let allele = Annotatable::vcf_allele("chr1", 23, "AT", "GT").unwrap();
        let result = pipeline.annotate(Some(&allele)).unwrap();
        assert_eq!(result["n1"], Some(AttributeValue::Float(0.4)));
        // the internal normalized_allele attribute stays out of the result
        assert!(!result.contains_key("normalized_allele"));
    }

    #[test]
    fn test_describe_lists_attributes() {
        let pipeline =
            build_pipeline_str(&repository(), "- position_score: scores/one\n", false)
                .unwrap();
        let text = pipeline.describe();
        assert!(text.contains("A0 position_score <scores/one>"));
        assert!(text.contains("s1 (float)"));
        assert!(text.contains("conservation score"));
    }
}
