use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Resource <{resource_id}> not found{}", constraint_suffix(.constraint))]
    ResourceNotFound {
        resource_id: String,
        constraint: Option<String>,
    },

    #[error("File <{filename}> not found in resource <{resource_id}>")]
    FileNotFound {
        resource_id: String,
        filename: String,
    },

    #[error("Invalid resource id: <{0}>")]
    InvalidResourceId(String),

    #[error("Invalid resource version: <{0}>")]
    InvalidVersion(String),

    #[error("Bad configuration of resource <{resource_id}>: {message}")]
    Config {
        resource_id: String,
        message: String,
    },

    #[error("Can't parse manifest of resource <{resource_id}>: {message}")]
    ManifestParse {
        resource_id: String,
        message: String,
    },

    #[error(
        "Cached copy of <{filename}> in resource <{resource_id}> \
         does not match the manifest md5 after refetch"
    )]
    CacheConsistency {
        resource_id: String,
        filename: String,
    },

    #[error("HTTP request to <{url}> failed: {message}")]
    Http { url: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn constraint_suffix(constraint: &Option<String>) -> String {
    match constraint {
        Some(c) => format!(" (version constraint: {})", c),
        None => String::new(),
    }
}
