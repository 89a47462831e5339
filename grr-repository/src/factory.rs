//! Building repositories from a YAML definition.
//!
//! A definition file lists repositories in lookup order:
//!
//! ```yaml
//! repositories:
//! - id: local
//!   type: directory
//!   directory: /data/grr
//! - id: public
//!   type: http
//!   url: https://grr.example.org/repo
//!   cache_dir: /data/grr-cache
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backends::dir::DirectoryProtocol;
use crate::backends::http::HttpProtocol;
use crate::cache::cache_repository;
use crate::error::{RepositoryError, Result};
use crate::group::GroupRepository;
use crate::protocol::Repository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositoryDefinition {
    Directory {
        id: String,
        directory: PathBuf,
    },
    Http {
        id: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_dir: Option<PathBuf>,
    },
}

impl RepositoryDefinition {
    pub fn id(&self) -> &str {
        match self {
            RepositoryDefinition::Directory { id, .. } => id,
            RepositoryDefinition::Http { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoriesConfig {
    pub repositories: Vec<RepositoryDefinition>,
}

impl RepositoriesConfig {
    pub fn from_yaml_str(text: &str) -> Result<RepositoriesConfig> {
        let config: RepositoriesConfig = serde_yaml::from_str(text)?;
        if config.repositories.is_empty() {
            return Err(RepositoryError::Config {
                resource_id: String::new(),
                message: "repository definition lists no repositories".to_string(),
            });
        }
        Ok(config)
    }
}

pub fn build_repository(definition: &RepositoryDefinition) -> Result<Repository> {
    match definition {
        RepositoryDefinition::Directory { id, directory } => Ok(Repository::new(
            Arc::new(DirectoryProtocol::new(id, directory)),
        )),
        RepositoryDefinition::Http { id, url, cache_dir } => {
            let repository = Repository::new(Arc::new(HttpProtocol::new(id, url)?));
            match cache_dir {
                Some(cache_dir) => Ok(cache_repository(&repository, cache_dir.clone())),
                None => Ok(repository),
            }
        }
    }
}

pub fn build_group(config: &RepositoriesConfig) -> Result<GroupRepository> {
    let children: Result<Vec<Repository>> =
        config.repositories.iter().map(build_repository).collect();
    Ok(GroupRepository::new(children?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_definitions() {
        let text = r"
repositories:
- id: local
  type: directory
  directory: /data/grr
- id: public
  type: http
  url: https://grr.example.org/repo
  cache_dir: /data/grr-cache
";
        let config = RepositoriesConfig::from_yaml_str(text).unwrap();
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].id(), "local");
        assert_eq!(
            config.repositories[1],
            RepositoryDefinition::Http {
                id: "public".to_string(),
                url: "https://grr.example.org/repo".to_string(),
                cache_dir: Some(PathBuf::from("/data/grr-cache")),
            }
        );
    }

    #[test]
    fn test_empty_definition_rejected() {
        assert!(RepositoriesConfig::from_yaml_str("repositories: []").is_err());
    }

    #[test]
    fn test_build_directory_repository() {
        let tmp = tempfile::TempDir::new().unwrap();
        let definition = RepositoryDefinition::Directory {
            id: "local".to_string(),
            directory: tmp.path().to_path_buf(),
        };
        let repository = build_repository(&definition).unwrap();
        assert_eq!(repository.repo_id(), "local");
        assert!(repository.all_resources().unwrap().is_empty());
    }
}
