use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnnotationError>;

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Bad configuration of annotator <{annotator_id}>: {message}")]
    Config {
        annotator_id: String,
        message: String,
    },

    #[error("Bad pipeline configuration: {0}")]
    PipelineConfig(String),

    #[error("The pipeline has repeated attributes: {0}")]
    DuplicateAttributes(String),

    #[error("Unknown annotator type <{annotator_type}> in <{annotator_id}>")]
    UnknownAnnotatorType {
        annotator_id: String,
        annotator_type: String,
    },

    #[error(transparent)]
    Score(#[from] grr_scores::ScoreError),

    #[error(transparent)]
    Resource(#[from] grr_resources::ResourceError),

    #[error(transparent)]
    Repository(#[from] grr_repository::RepositoryError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
