//! Resource versions and version constraints.
//!
//! A resource version is a dotted tuple of non-negative integers, e.g.
//! `3.2.1`. On disk a versioned resource lives in a directory named
//! `<id>(<version>)`; the unversioned form denotes version `0`.

use std::fmt::{self, Display};

use crate::error::{RepositoryError, Result};

/// Dotted integer version of a resource, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ResourceVersion(pub Vec<u32>);

impl ResourceVersion {
    pub fn parse(text: &str) -> Result<ResourceVersion> {
        let parts: std::result::Result<Vec<u32>, _> =
            text.split('.').map(str::parse).collect();
        match parts {
            Ok(parts) if !parts.is_empty() => Ok(ResourceVersion(parts)),
            _ => Err(RepositoryError::InvalidVersion(text.to_string())),
        }
    }

    pub fn is_default(&self) -> bool {
        self.0.iter().all(|&p| p == 0)
    }
}

impl Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Version constraint attached to a resource id at lookup time.
///
/// `=X.Y` requires an exact version prefix match, `>=X.Y` (the default
/// when no operator is given) accepts any version at or above. Among
/// matching versions the highest one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Exact(ResourceVersion),
    AtLeast(ResourceVersion),
}

impl VersionConstraint {
    pub fn parse(text: &str) -> Result<VersionConstraint> {
        if let Some(rest) = text.strip_prefix(">=") {
            Ok(VersionConstraint::AtLeast(ResourceVersion::parse(rest)?))
        } else if let Some(rest) = text.strip_prefix('=') {
            Ok(VersionConstraint::Exact(ResourceVersion::parse(rest)?))
        } else {
            Ok(VersionConstraint::AtLeast(ResourceVersion::parse(text)?))
        }
    }

    pub fn matches(&self, version: &ResourceVersion) -> bool {
        match self {
            VersionConstraint::Exact(wanted) => {
                version.0.len() >= wanted.0.len()
                    && version.0[..wanted.0.len()] == wanted.0[..]
            }
            VersionConstraint::AtLeast(wanted) => version >= wanted,
        }
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "={}", v),
            VersionConstraint::AtLeast(v) => write!(f, ">={}", v),
        }
    }
}

fn is_valid_id_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

/// Check a resource id: one or more `[a-zA-Z0-9._-]+` tokens joined by `/`.
pub fn is_valid_resource_id(resource_id: &str) -> bool {
    !resource_id.is_empty() && resource_id.split('/').all(is_valid_id_token)
}

/// Split a versioned directory name `<token>(<version>)` into its parts.
///
/// A plain token parses as version `0`.
pub fn parse_versioned_token(token: &str) -> Result<(String, ResourceVersion)> {
    match token.find('(') {
        None => {
            if !is_valid_id_token(token) {
                return Err(RepositoryError::InvalidResourceId(token.to_string()));
            }
            Ok((token.to_string(), ResourceVersion(vec![0])))
        }
        Some(open) => {
            let name = &token[..open];
            let rest = &token[open + 1..];
            let Some(version_text) = rest.strip_suffix(')') else {
                return Err(RepositoryError::InvalidResourceId(token.to_string()));
            };
            if !is_valid_id_token(name) {
                return Err(RepositoryError::InvalidResourceId(token.to_string()));
            }
            Ok((name.to_string(), ResourceVersion::parse(version_text)?))
        }
    }
}

/// Compose the storage name of a resource: `<id>` or `<id>(<version>)`.
pub fn versioned_id(resource_id: &str, version: &ResourceVersion) -> String {
    if version.is_default() {
        resource_id.to_string()
    } else {
        format!("{}({})", resource_id, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("3.2.1", vec![3, 2, 1])]
    #[case("0", vec![0])]
    #[case("10.0", vec![10, 0])]
    fn test_parse_version(#[case] text: &str, #[case] expected: Vec<u32>) {
        assert_eq!(ResourceVersion::parse(text).unwrap().0, expected);
    }

    #[rstest]
    #[case("")]
    #[case("1.")]
    #[case("a.b")]
    #[case("1.-2")]
    fn test_parse_version_rejects(#[case] text: &str) {
        assert!(ResourceVersion::parse(text).is_err());
    }

    #[test]
    fn test_version_ordering() {
        let v = |t: &str| ResourceVersion::parse(t).unwrap();
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.2.1") > v("1.2"));
    }

    #[rstest]
    #[case(">=1.2", "1.2", true)]
    #[case(">=1.2", "1.3", true)]
    #[case(">=1.2", "1.1", false)]
    #[case("1.2", "2.0", true)]
    #[case("=1.2", "1.2", true)]
    #[case("=1.2", "1.2.5", true)]
    #[case("=1.2", "1.3", false)]
    fn test_constraint_matches(
        #[case] constraint: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        let constraint = VersionConstraint::parse(constraint).unwrap();
        let version = ResourceVersion::parse(version).unwrap();
        assert_eq!(constraint.matches(&version), expected);
    }

    #[rstest]
    #[case("hg38", "hg38", vec![0])]
    #[case("scores(3.2)", "scores", vec![3, 2])]
    #[case("gene_models-v1(1.0.1)", "gene_models-v1", vec![1, 0, 1])]
    fn test_parse_versioned_token(
        #[case] token: &str,
        #[case] name: &str,
        #[case] version: Vec<u32>,
    ) {
        let (parsed_name, parsed_version) = parse_versioned_token(token).unwrap();
        assert_eq!(parsed_name, name);
        assert_eq!(parsed_version.0, version);
    }

    #[rstest]
    #[case("scores(")]
    #[case("scores(1.0")]
    #[case("sco res")]
    #[case("(1.0)")]
    fn test_parse_versioned_token_rejects(#[case] token: &str) {
        assert!(parse_versioned_token(token).is_err());
    }

    #[test]
    fn test_valid_resource_ids() {
        assert!(is_valid_resource_id("hg38/scores/phastCons100way"));
        assert!(is_valid_resource_id("gene_models.v1"));
        assert!(!is_valid_resource_id("hg38//scores"));
        assert!(!is_valid_resource_id(""));
        assert!(!is_valid_resource_id("scores/pha$t"));
    }

    #[test]
    fn test_versioned_id_roundtrip() {
        let version = ResourceVersion::parse("2.1").unwrap();
        assert_eq!(versioned_id("scores", &version), "scores(2.1)");
        assert_eq!(versioned_id("scores", &ResourceVersion(vec![0])), "scores");
    }
}
