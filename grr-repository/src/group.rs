//! Ordered group of repositories searched front to back.

use std::collections::HashSet;

use crate::error::{RepositoryError, Result};
use crate::protocol::{Repository, Resource};

/// Several repositories presented as one. Lookups return the match
/// from the first child repository that carries the resource id;
/// version resolution happens within that child only.
#[derive(Clone, Default)]
pub struct GroupRepository {
    children: Vec<Repository>,
}

impl GroupRepository {
    pub fn new(children: Vec<Repository>) -> GroupRepository {
        GroupRepository { children }
    }

    pub fn children(&self) -> &[Repository] {
        &self.children
    }

    pub fn find_resource(
        &self,
        resource_id: &str,
        constraint: Option<&str>,
    ) -> Result<Option<Resource>> {
        for child in &self.children {
            if let Some(resource) = child.find_resource(resource_id, constraint)? {
                return Ok(Some(resource));
            }
        }
        Ok(None)
    }

    pub fn get_resource(
        &self,
        resource_id: &str,
        constraint: Option<&str>,
    ) -> Result<Resource> {
        self.find_resource(resource_id, constraint)?.ok_or_else(|| {
            RepositoryError::ResourceNotFound {
                resource_id: resource_id.to_string(),
                constraint: constraint.map(str::to_string),
            }
        })
    }

    /// All resources, earlier children shadowing later ones.
    pub fn all_resources(&self) -> Result<Vec<Resource>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut resources = Vec::new();
        for child in &self.children {
            for resource in child.all_resources()? {
                if seen.insert(resource.full_id()) {
                    resources.push(resource);
                }
            }
        }
        Ok(resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use crate::backends::inmemory::build_inmemory_repository;

    fn repo_with(repo_id: &str, resource: &str, marker: &str) -> Repository {
        let mut files = BTreeMap::new();
        files.insert(
            format!("{}/genomic_resource.yaml", resource),
            format!("meta:\n  description: {}\n", marker).into_bytes(),
        );
        build_inmemory_repository(repo_id, files)
    }

    #[test]
    fn test_first_child_wins() {
        let group = GroupRepository::new(vec![
            repo_with("first", "shared", "from-first"),
            repo_with("second", "shared", "from-second"),
        ]);
        let resource = group.get_resource("shared", None).unwrap();
        assert_eq!(resource.repo_id(), "first");
        assert_eq!(group.all_resources().unwrap().len(), 1);
    }

    #[test]
    fn test_fallthrough_to_later_child() {
        let group = GroupRepository::new(vec![
            repo_with("first", "alpha", "a"),
            repo_with("second", "beta", "b"),
        ]);
        assert_eq!(group.get_resource("beta", None).unwrap().repo_id(), "second");
        assert!(group.find_resource("gamma", None).unwrap().is_none());
    }
}
