use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResourceError>;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Bad configuration of resource <{resource_id}>: {message}")]
    Config {
        resource_id: String,
        message: String,
    },

    #[error("Chromosome <{chrom}> not found in resource <{resource_id}>")]
    UnknownChromosome {
        resource_id: String,
        chrom: String,
    },

    #[error("Position {chrom}:{pos} outside of chromosome in resource <{resource_id}>")]
    PositionOutOfBounds {
        resource_id: String,
        chrom: String,
        pos: u64,
    },

    #[error("Can't parse <{filename}> in resource <{resource_id}>: {message}")]
    Parse {
        resource_id: String,
        filename: String,
        message: String,
    },

    #[error(transparent)]
    Repository(#[from] grr_repository::RepositoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
