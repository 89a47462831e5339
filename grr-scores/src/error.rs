use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoreError>;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Bad score configuration in resource <{resource_id}>: {message}")]
    Config {
        resource_id: String,
        message: String,
    },

    #[error("Unknown score <{score_id}> in resource <{resource_id}>")]
    UnknownScore {
        resource_id: String,
        score_id: String,
    },

    #[error("Unknown aggregator specification: <{0}>")]
    UnknownAggregator(String),

    #[error("Bad histogram configuration for score <{score_id}>: {message}")]
    Histogram { score_id: String, message: String },

    #[error(transparent)]
    Table(#[from] grr_tables::TableError),

    #[error(transparent)]
    Repository(#[from] grr_repository::RepositoryError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
