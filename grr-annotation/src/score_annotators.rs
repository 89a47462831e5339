//! Annotators backed by score resources.

use std::collections::{HashMap, HashSet};

use grr_core::Annotatable;
use grr_repository::Resource;
use grr_scores::{AlleleScore, NpScore, PositionScore, ScoreConfig, VcfInfoScore};

use crate::annotator::Annotator;
use crate::attributes::{AttributeInfo, AttributeMap, empty_result};
use crate::config::AnnotatorConfig;
use crate::context::AnnotationContext;
use crate::error::{AnnotationError, Result};

/// Aggregated region fetches over longer regions yield no-score.
const MAX_AGGREGATION_LENGTH: u64 = 500_000;

/// Attribute declarations and aggregator overrides resolved against a
/// score resource's configuration.
struct ScoreAttributes {
    attributes: Vec<AttributeInfo>,
    sources: Vec<String>,
    position_overrides: HashMap<String, String>,
    nucleotide_overrides: HashMap<String, String>,
}

impl ScoreAttributes {
    fn resolve(
        config: &AnnotatorConfig,
        score_config: &ScoreConfig,
        allow_nucleotide_aggregators: bool,
        allow_position_aggregators: bool,
    ) -> Result<ScoreAttributes> {
        let config_error = |message: String| AnnotationError::Config {
            annotator_id: config.annotator_id.clone(),
            message,
        };

        let mut attributes = Vec::new();
        let mut sources = Vec::new();
        let mut position_overrides = HashMap::new();
        let mut nucleotide_overrides = HashMap::new();

        if config.attributes.is_empty() {
            // a resource without an explicit attribute list contributes
            // all of its scores under their own ids
            for def in &score_config.scores {
                attributes.push(AttributeInfo {
                    name: def.id.clone(),
                    source: def.id.clone(),
                    value_type: def.value_type.into(),
                    internal: false,
                    description: def.desc.clone().unwrap_or_default(),
                });
                sources.push(def.id.clone());
            }
            return Ok(ScoreAttributes {
                attributes,
                sources,
                position_overrides,
                nucleotide_overrides,
            });
        }

        for attribute in &config.attributes {
            let source = attribute.resolved_source().unwrap_or_default();
            let name = attribute.resolved_name().unwrap_or_default();
            let def = score_config
                .scores
                .iter()
                .find(|def| def.id == source)
                .ok_or_else(|| {
                    config_error(format!("unknown score <{}>", source))
                })?;
            if let Some(spec) = &attribute.position_aggregator {
                if !allow_position_aggregators {
                    return Err(config_error(
                        "position_aggregator is not allowed here".to_string(),
                    ));
                }
                position_overrides.insert(source.to_string(), spec.clone());
            }
            if let Some(spec) = &attribute.nucleotide_aggregator {
                if !allow_nucleotide_aggregators {
                    return Err(config_error(
                        "nucleotide_aggregator is not allowed here".to_string(),
                    ));
                }
                nucleotide_overrides.insert(source.to_string(), spec.clone());
            }
            attributes.push(AttributeInfo {
                name: name.to_string(),
                source: source.to_string(),
                value_type: def.value_type.into(),
                internal: attribute.internal,
                description: def.desc.clone().unwrap_or_default(),
            });
            sources.push(source.to_string());
        }

        Ok(ScoreAttributes {
            attributes,
            sources,
            position_overrides,
            nucleotide_overrides,
        })
    }

    fn source_refs(&self) -> Vec<&str> {
        self.sources.iter().map(String::as_str).collect()
    }

    /// Zip fetched values (ordered as `sources`) with attribute names.
    fn to_attribute_map(&self, values: Vec<Option<grr_core::AttributeValue>>) -> AttributeMap {
        self.attributes
            .iter()
            .zip(values)
            .map(|(info, value)| (info.name.clone(), value))
            .collect()
    }
}

fn check_resource_type(
    config: &AnnotatorConfig,
    resource: &Resource,
    expected: &str,
) -> Result<()> {
    if resource.resource_type() != expected {
        return Err(AnnotationError::Config {
            annotator_id: config.annotator_id.clone(),
            message: format!(
                "resource <{}> has type <{}>, expected <{}>",
                resource.id(),
                resource.resource_type(),
                expected
            ),
        });
    }
    Ok(())
}

fn score_config(resource: &Resource) -> Result<ScoreConfig> {
    Ok(resource.config().deserialize::<ScoreConfig>(resource.id())?)
}

macro_rules! annotator_accessors {
    () => {
        fn annotator_id(&self) -> &str {
            &self.annotator_id
        }

        fn resource_id(&self) -> Option<&str> {
            Some(self.resource.id())
        }

        fn attributes(&self) -> &[AttributeInfo] {
            &self.shared.attributes
        }

        fn attributes_mut(&mut self) -> &mut [AttributeInfo] {
            &mut self.shared.attributes
        }

        fn input_annotatable(&self) -> Option<&str> {
            self.input_annotatable.as_deref()
        }
    };
}

/// Annotates with per-position scores; region annotatables aggregate
/// over their span.
pub struct PositionScoreAnnotator {
    annotator_id: String,
    resource: Resource,
    input_annotatable: Option<String>,
    shared: ScoreAttributes,
    score: Option<PositionScore>,
    chromosomes: HashSet<String>,
}

impl PositionScoreAnnotator {
    pub fn new(resource: Resource, config: &AnnotatorConfig) -> Result<PositionScoreAnnotator> {
        check_resource_type(config, &resource, "position_score")?;
        let shared =
            ScoreAttributes::resolve(config, &score_config(&resource)?, false, true)?;
        Ok(PositionScoreAnnotator {
            annotator_id: config.annotator_id.clone(),
            resource,
            input_annotatable: config.input_annotatable.clone(),
            shared,
            score: None,
            chromosomes: HashSet::new(),
        })
    }
}

impl Annotator for PositionScoreAnnotator {
    fn annotator_type(&self) -> &'static str {
        "position_score"
    }

    annotator_accessors!();

    fn open(&mut self) -> Result<()> {
        if self.score.is_none() {
            let score = PositionScore::open(&self.resource)?;
            self.chromosomes = score.chromosomes().into_iter().collect();
            self.score = Some(score);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.score.is_some()
    }

    fn close(&mut self) {
        self.score = None;
        self.chromosomes.clear();
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let Some(annotatable) = annotatable else {
            return Ok(empty_result(&self.shared.attributes));
        };
        if !self.chromosomes.contains(annotatable.chrom()) {
            return Ok(empty_result(&self.shared.attributes));
        }
        let score = self.score.as_mut().ok_or_else(|| AnnotationError::Config {
            annotator_id: self.annotator_id.clone(),
            message: "annotator is not open".to_string(),
        })?;

        let sources = self.shared.source_refs();
        let fetched = if annotatable.len() == 1 {
            score.fetch_scores(annotatable.chrom(), annotatable.pos(), Some(&sources))
        } else if annotatable.len() > MAX_AGGREGATION_LENGTH {
            Ok(None)
        } else {
            score
                .fetch_scores_agg(
                    annotatable.chrom(),
                    annotatable.pos(),
                    annotatable.pos_end(),
                    Some(&sources),
                    Some(&self.shared.position_overrides),
                )
                .map(Some)
        };
        match fetched {
            Ok(Some(values)) => Ok(self.shared.to_attribute_map(values)),
            Ok(None) => Ok(empty_result(&self.shared.attributes)),
            Err(err) => {
                tracing::warn!(
                    annotator = %self.annotator_id,
                    %annotatable,
                    error = %err,
                    "score lookup failed"
                );
                Ok(empty_result(&self.shared.attributes))
            }
        }
    }
}

/// Annotates substitutions with nucleotide-position scores; regions
/// aggregate in two stages, nucleotides first, positions second.
pub struct NpScoreAnnotator {
    annotator_id: String,
    resource: Resource,
    input_annotatable: Option<String>,
    shared: ScoreAttributes,
    score: Option<NpScore>,
    chromosomes: HashSet<String>,
}

impl NpScoreAnnotator {
    pub fn new(resource: Resource, config: &AnnotatorConfig) -> Result<NpScoreAnnotator> {
        check_resource_type(config, &resource, "np_score")?;
        let shared =
            ScoreAttributes::resolve(config, &score_config(&resource)?, true, true)?;
        Ok(NpScoreAnnotator {
            annotator_id: config.annotator_id.clone(),
            resource,
            input_annotatable: config.input_annotatable.clone(),
            shared,
            score: None,
            chromosomes: HashSet::new(),
        })
    }
}

impl Annotator for NpScoreAnnotator {
    fn annotator_type(&self) -> &'static str {
        "np_score"
    }

    annotator_accessors!();

    fn open(&mut self) -> Result<()> {
        if self.score.is_none() {
            let score = NpScore::open(&self.resource)?;
            self.chromosomes = score.chromosomes().into_iter().collect();
            self.score = Some(score);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.score.is_some()
    }

    fn close(&mut self) {
        self.score = None;
        self.chromosomes.clear();
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let Some(annotatable) = annotatable else {
            return Ok(empty_result(&self.shared.attributes));
        };
        if !self.chromosomes.contains(annotatable.chrom()) {
            return Ok(empty_result(&self.shared.attributes));
        }
        let score = self.score.as_mut().ok_or_else(|| AnnotationError::Config {
            annotator_id: self.annotator_id.clone(),
            message: "annotator is not open".to_string(),
        })?;

        let sources = self.shared.source_refs();
        let fetched = match annotatable {
            Annotatable::VcfAllele(allele)
                if allele.kind() == grr_core::VariantKind::Substitution =>
            {
                let trimmed = allele.parsimonious();
                score.fetch_scores(
                    &trimmed.chrom,
                    trimmed.pos,
                    &trimmed.reference,
                    &trimmed.alternative,
                    Some(&sources),
                )
            }
            _ if annotatable.len() > MAX_AGGREGATION_LENGTH => Ok(None),
            _ => score
                .fetch_scores_agg(
                    annotatable.chrom(),
                    annotatable.pos(),
                    annotatable.pos_end(),
                    Some(&sources),
                    Some(&self.shared.position_overrides),
                    Some(&self.shared.nucleotide_overrides),
                )
                .map(Some),
        };
        match fetched {
            Ok(Some(values)) => Ok(self.shared.to_attribute_map(values)),
            Ok(None) => Ok(empty_result(&self.shared.attributes)),
            Err(err) => {
                tracing::warn!(
                    annotator = %self.annotator_id,
                    %annotatable,
                    error = %err,
                    "score lookup failed"
                );
                Ok(empty_result(&self.shared.attributes))
            }
        }
    }
}

/// Annotates VCF alleles with allele-matched scores. Region and
/// copy-number annotatables always yield no value.
pub struct AlleleScoreAnnotator {
    annotator_id: String,
    resource: Resource,
    input_annotatable: Option<String>,
    shared: ScoreAttributes,
    score: Option<AlleleScore>,
    chromosomes: HashSet<String>,
}

impl AlleleScoreAnnotator {
    pub fn new(resource: Resource, config: &AnnotatorConfig) -> Result<AlleleScoreAnnotator> {
        check_resource_type(config, &resource, "allele_score")?;
        let shared =
            ScoreAttributes::resolve(config, &score_config(&resource)?, false, false)?;
        Ok(AlleleScoreAnnotator {
            annotator_id: config.annotator_id.clone(),
            resource,
            input_annotatable: config.input_annotatable.clone(),
            shared,
            score: None,
            chromosomes: HashSet::new(),
        })
    }
}

impl Annotator for AlleleScoreAnnotator {
    fn annotator_type(&self) -> &'static str {
        "allele_score"
    }

    annotator_accessors!();

    fn open(&mut self) -> Result<()> {
        if self.score.is_none() {
            let score = AlleleScore::open(&self.resource)?;
            self.chromosomes = score.chromosomes().into_iter().collect();
            self.score = Some(score);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.score.is_some()
    }

    fn close(&mut self) {
        self.score = None;
        self.chromosomes.clear();
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let Some(Annotatable::VcfAllele(allele)) = annotatable else {
            return Ok(empty_result(&self.shared.attributes));
        };
        if !self.chromosomes.contains(allele.chrom.as_str()) {
            return Ok(empty_result(&self.shared.attributes));
        }
        let score = self.score.as_mut().ok_or_else(|| AnnotationError::Config {
            annotator_id: self.annotator_id.clone(),
            message: "annotator is not open".to_string(),
        })?;

        let sources = self.shared.source_refs();
        match score.fetch_scores(
            &allele.chrom,
            allele.pos,
            &allele.reference,
            &allele.alternative,
            Some(&sources),
        ) {
            Ok(Some(values)) => Ok(self.shared.to_attribute_map(values)),
            Ok(None) => Ok(empty_result(&self.shared.attributes)),
            Err(err) => {
                tracing::warn!(
                    annotator = %self.annotator_id,
                    allele = %allele,
                    error = %err,
                    "score lookup failed"
                );
                Ok(empty_result(&self.shared.attributes))
            }
        }
    }
}

/// Annotates VCF alleles with values carried in VCF INFO fields.
pub struct VcfInfoAnnotator {
    annotator_id: String,
    resource: Resource,
    input_annotatable: Option<String>,
    shared: ScoreAttributes,
    score: Option<VcfInfoScore>,
    chromosomes: HashSet<String>,
}

impl VcfInfoAnnotator {
    pub fn new(resource: Resource, config: &AnnotatorConfig) -> Result<VcfInfoAnnotator> {
        check_resource_type(config, &resource, "vcf_info")?;
        let shared =
            ScoreAttributes::resolve(config, &score_config(&resource)?, false, false)?;
        Ok(VcfInfoAnnotator {
            annotator_id: config.annotator_id.clone(),
            resource,
            input_annotatable: config.input_annotatable.clone(),
            shared,
            score: None,
            chromosomes: HashSet::new(),
        })
    }
}

impl Annotator for VcfInfoAnnotator {
    fn annotator_type(&self) -> &'static str {
        "vcf_info"
    }

    annotator_accessors!();

    fn open(&mut self) -> Result<()> {
        if self.score.is_none() {
            let score = VcfInfoScore::open(&self.resource)?;
            self.chromosomes = score.chromosomes().into_iter().collect();
            self.score = Some(score);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.score.is_some()
    }

    fn close(&mut self) {
        self.score = None;
        self.chromosomes.clear();
    }

    fn annotate(
        &mut self,
        annotatable: Option<&Annotatable>,
        _context: &mut AnnotationContext,
    ) -> Result<AttributeMap> {
        let Some(Annotatable::VcfAllele(allele)) = annotatable else {
            return Ok(empty_result(&self.shared.attributes));
        };
        if !self.chromosomes.contains(allele.chrom.as_str()) {
            return Ok(empty_result(&self.shared.attributes));
        }
        let score = self.score.as_mut().ok_or_else(|| AnnotationError::Config {
            annotator_id: self.annotator_id.clone(),
            message: "annotator is not open".to_string(),
        })?;

        let sources = self.shared.source_refs();
        match score.fetch_scores(
            &allele.chrom,
            allele.pos,
            &allele.reference,
            &allele.alternative,
            Some(&sources),
        ) {
            Ok(Some(values)) => Ok(self.shared.to_attribute_map(values)),
            Ok(None) => Ok(empty_result(&self.shared.attributes)),
            Err(err) => {
                tracing::warn!(
                    annotator = %self.annotator_id,
                    allele = %allele,
                    error = %err,
                    "INFO lookup failed"
                );
                Ok(empty_result(&self.shared.attributes))
            }
        }
    }
}
