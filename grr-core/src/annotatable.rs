//! The typed genomic values enriched by the annotation pipeline.
//!
//! An [`Annotatable`] is either a single position, a region, a VCF-style
//! allele, or a copy-number allele. Values are never mutated after
//! construction; normalization produces a new value.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Structural classification of an annotatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Position,
    Region,
    Substitution,
    SmallInsertion,
    SmallDeletion,
    Complex,
    LargeDeletion,
    LargeDuplication,
}

impl Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariantKind::Position => "position",
            VariantKind::Region => "region",
            VariantKind::Substitution => "substitution",
            VariantKind::SmallInsertion => "small_insertion",
            VariantKind::SmallDeletion => "small_deletion",
            VariantKind::Complex => "complex",
            VariantKind::LargeDeletion => "large_deletion",
            VariantKind::LargeDuplication => "large_duplication",
        };
        write!(f, "{}", name)
    }
}

/// Copy-number allele classification, given explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CnvKind {
    LargeDeletion,
    LargeDuplication,
}

/// A VCF-style allele: chromosome, 1-based position, reference and
/// alternative sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VcfAllele {
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternative: String,
}

impl VcfAllele {
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        reference: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let allele = VcfAllele {
            chrom: chrom.into(),
            pos,
            reference: reference.into(),
            alternative: alternative.into(),
        };
        if allele.reference.is_empty() || allele.alternative.is_empty() {
            return Err(CoreError::EmptyAlleleSequence(allele.to_string()));
        }
        Ok(allele)
    }

    /// End position, inclusive: the last reference base covered.
    pub fn pos_end(&self) -> u64 {
        self.pos + self.reference.len() as u64 - 1
    }

    /// Classification computed from the sequence length relationship.
    ///
    /// The classification is defined on the parsimonious form; untrimmed
    /// alleles are trimmed first.
    pub fn kind(&self) -> VariantKind {
        let trimmed = self.parsimonious();
        let (rlen, alen) = (trimmed.reference.len(), trimmed.alternative.len());
        if rlen == 1 && alen == 1 {
            VariantKind::Substitution
        } else if rlen < alen && trimmed.alternative.starts_with(&trimmed.reference) {
            VariantKind::SmallInsertion
        } else if rlen > alen && trimmed.reference.starts_with(&trimmed.alternative) {
            VariantKind::SmallDeletion
        } else {
            VariantKind::Complex
        }
    }

    /// Return the parsimonious form of this allele.
    ///
    /// The longest shared suffix is trimmed first, then the longest shared
    /// prefix, always keeping at least one base of each sequence. The
    /// position advances by the trimmed prefix length. Trimming an already
    /// trimmed allele is a no-op.
    pub fn parsimonious(&self) -> VcfAllele {
        let reference = self.reference.as_bytes();
        let alternative = self.alternative.as_bytes();

        let mut ref_end = reference.len();
        let mut alt_end = alternative.len();
        while ref_end > 1 && alt_end > 1 && reference[ref_end - 1] == alternative[alt_end - 1] {
            ref_end -= 1;
            alt_end -= 1;
        }

        let mut start = 0;
        while start + 1 < ref_end && start + 1 < alt_end && reference[start] == alternative[start] {
            start += 1;
        }

        VcfAllele {
            chrom: self.chrom.clone(),
            pos: self.pos + start as u64,
            reference: self.reference[start..ref_end].to_string(),
            alternative: self.alternative[start..alt_end].to_string(),
        }
    }
}

impl Display for VcfAllele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.chrom, self.pos, self.reference, self.alternative
        )
    }
}

/// A copy-number allele spanning a region, classified by an explicit kind
/// instead of sequence arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CnvAllele {
    pub chrom: String,
    pub pos: u64,
    pub pos_end: u64,
    pub kind: CnvKind,
}

/// A typed genomic value to be enriched by the annotation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotatable {
    Position { chrom: String, pos: u64 },
    Region { chrom: String, pos: u64, pos_end: u64 },
    VcfAllele(VcfAllele),
    CnvAllele(CnvAllele),
}

impl Annotatable {
    pub fn position(chrom: impl Into<String>, pos: u64) -> Self {
        Annotatable::Position {
            chrom: chrom.into(),
            pos,
        }
    }

    pub fn region(
        chrom: impl Into<String>,
        pos: u64,
        pos_end: u64,
    ) -> Result<Self, CoreError> {
        if pos_end < pos {
            return Err(CoreError::InvalidPosition(format!(
                "region end {} before start {}",
                pos_end, pos
            )));
        }
        Ok(Annotatable::Region {
            chrom: chrom.into(),
            pos,
            pos_end,
        })
    }

    pub fn vcf_allele(
        chrom: impl Into<String>,
        pos: u64,
        reference: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Ok(Annotatable::VcfAllele(VcfAllele::new(
            chrom,
            pos,
            reference,
            alternative,
        )?))
    }

    pub fn cnv_allele(
        chrom: impl Into<String>,
        pos: u64,
        pos_end: u64,
        kind: CnvKind,
    ) -> Result<Self, CoreError> {
        if pos_end < pos {
            return Err(CoreError::InvalidPosition(format!(
                "CNV end {} before start {}",
                pos_end, pos
            )));
        }
        Ok(Annotatable::CnvAllele(CnvAllele {
            chrom: chrom.into(),
            pos,
            pos_end,
            kind,
        }))
    }

    pub fn chrom(&self) -> &str {
        match self {
            Annotatable::Position { chrom, .. } => chrom,
            Annotatable::Region { chrom, .. } => chrom,
            Annotatable::VcfAllele(allele) => &allele.chrom,
            Annotatable::CnvAllele(cnv) => &cnv.chrom,
        }
    }

    pub fn pos(&self) -> u64 {
        match self {
            Annotatable::Position { pos, .. } => *pos,
            Annotatable::Region { pos, .. } => *pos,
            Annotatable::VcfAllele(allele) => allele.pos,
            Annotatable::CnvAllele(cnv) => cnv.pos,
        }
    }

    pub fn pos_end(&self) -> u64 {
        match self {
            Annotatable::Position { pos, .. } => *pos,
            Annotatable::Region { pos_end, .. } => *pos_end,
            Annotatable::VcfAllele(allele) => allele.pos_end(),
            Annotatable::CnvAllele(cnv) => cnv.pos_end,
        }
    }

    /// Covered length in bases, inclusive on both ends.
    pub fn len(&self) -> u64 {
        self.pos_end() - self.pos() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Annotatable::Position { .. } => VariantKind::Position,
            Annotatable::Region { .. } => VariantKind::Region,
            Annotatable::VcfAllele(allele) => allele.kind(),
            Annotatable::CnvAllele(cnv) => match cnv.kind {
                CnvKind::LargeDeletion => VariantKind::LargeDeletion,
                CnvKind::LargeDuplication => VariantKind::LargeDuplication,
            },
        }
    }

    /// Parsimony-normalized copy of this annotatable.
    ///
    /// Only VCF alleles carry shared flanking sequence; every other kind
    /// is returned unchanged.
    pub fn normalized(&self) -> Annotatable {
        match self {
            Annotatable::VcfAllele(allele) => Annotatable::VcfAllele(allele.parsimonious()),
            other => other.clone(),
        }
    }

    /// Copy of this annotatable placed on a different chromosome/position,
    /// used by coordinate-transforming annotators.
    pub fn with_location(&self, chrom: impl Into<String>, pos: u64) -> Annotatable {
        let chrom = chrom.into();
        match self {
            Annotatable::Position { .. } => Annotatable::Position { chrom, pos },
            Annotatable::Region { pos: old_pos, pos_end, .. } => Annotatable::Region {
                chrom,
                pos,
                pos_end: pos + (pos_end - old_pos),
            },
            Annotatable::VcfAllele(allele) => Annotatable::VcfAllele(VcfAllele {
                chrom,
                pos,
                reference: allele.reference.clone(),
                alternative: allele.alternative.clone(),
            }),
            Annotatable::CnvAllele(cnv) => Annotatable::CnvAllele(CnvAllele {
                chrom,
                pos,
                pos_end: pos + (cnv.pos_end - cnv.pos),
                kind: cnv.kind,
            }),
        }
    }
}

impl Display for Annotatable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotatable::Position { chrom, pos } => write!(f, "{}:{}", chrom, pos),
            Annotatable::Region { chrom, pos, pos_end } => {
                write!(f, "{}:{}-{}", chrom, pos, pos_end)
            }
            Annotatable::VcfAllele(allele) => write!(f, "{}", allele),
            Annotatable::CnvAllele(cnv) => {
                write!(f, "{}:{}-{} {}", cnv.chrom, cnv.pos, cnv.pos_end, match cnv.kind {
                    CnvKind::LargeDeletion => "large_deletion",
                    CnvKind::LargeDuplication => "large_duplication",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("A", "G", 10, 10, "A", "G", VariantKind::Substitution)]
    #[case("CA", "CG", 10, 11, "A", "G", VariantKind::Substitution)]
    #[case("A", "ACT", 10, 10, "A", "ACT", VariantKind::SmallInsertion)]
    #[case("ACT", "A", 10, 10, "ACT", "A", VariantKind::SmallDeletion)]
    #[case("CAGT", "CT", 10, 12, "CAG", "C", VariantKind::SmallDeletion)]
    #[case("AC", "GT", 10, 11, "AC", "GT", VariantKind::Complex)]
    fn test_parsimonious_and_kind(
        #[case] reference: &str,
        #[case] alternative: &str,
        #[case] pos: u64,
        #[case] expected_pos: u64,
        #[case] expected_ref: &str,
        #[case] expected_alt: &str,
        #[case] expected_kind: VariantKind,
    ) {
        let allele = VcfAllele::new("chr1", pos, reference, alternative).unwrap();
        let trimmed = allele.parsimonious();
        assert_eq!(trimmed.pos, expected_pos);
        assert_eq!(trimmed.reference, expected_ref);
        assert_eq!(trimmed.alternative, expected_alt);
        assert_eq!(allele.kind(), expected_kind);
    }

    #[rstest]
    #[case("GGCA", "GGCTCA")]
    #[case("TTT", "T")]
    #[case("A", "A")]
    #[case("CATTG", "CAG")]
    fn test_trim_is_idempotent(#[case] reference: &str, #[case] alternative: &str) {
        let allele = VcfAllele::new("1", 100, reference, alternative).unwrap();
        let once = allele.parsimonious();
        let twice = once.parsimonious();
        assert_eq!(once, twice);
    }

    #[rstest]
    fn test_trim_never_grows() {
        let allele = VcfAllele::new("1", 5, "CATTTG", "CATG").unwrap();
        let trimmed = allele.parsimonious();
        let before = allele.reference.len().max(allele.alternative.len());
        let after = trimmed.reference.len().max(trimmed.alternative.len());
        assert!(after <= before);
    }

    #[rstest]
    fn test_vcf_allele_pos_end() {
        let allele = VcfAllele::new("1", 10, "ACT", "A").unwrap();
        assert_eq!(allele.pos_end(), 12);

        let trimmed = allele.parsimonious();
        assert_eq!(
            trimmed.pos_end(),
            trimmed.pos + trimmed.reference.len() as u64 - 1
        );
    }

    #[rstest]
    fn test_region_end_before_start_is_rejected() {
        assert!(Annotatable::region("1", 20, 10).is_err());
    }

    #[rstest]
    fn test_cnv_kinds() {
        let del = Annotatable::cnv_allele("1", 1000, 200_000, CnvKind::LargeDeletion).unwrap();
        assert_eq!(del.kind(), VariantKind::LargeDeletion);
        let dup = Annotatable::cnv_allele("1", 1000, 200_000, CnvKind::LargeDuplication).unwrap();
        assert_eq!(dup.kind(), VariantKind::LargeDuplication);
        // normalization is a no-op for copy-number alleles
        assert_eq!(del.normalized(), del);
    }

    #[rstest]
    fn test_empty_allele_sequence_rejected() {
        assert!(VcfAllele::new("1", 10, "", "A").is_err());
        assert!(VcfAllele::new("1", 10, "A", "").is_err());
    }
}
