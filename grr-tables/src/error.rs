use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Bad table configuration in resource <{resource_id}>: {message}")]
    Config {
        resource_id: String,
        message: String,
    },

    #[error("Column <{column}> not found in table of resource <{resource_id}>")]
    UnknownColumn {
        resource_id: String,
        column: String,
    },

    #[error("Can't parse table line {line_number} of <{filename}>: {message}")]
    Parse {
        filename: String,
        line_number: u64,
        message: String,
    },

    #[error("Tabix index error for <{filename}>: {message}")]
    Index { filename: String, message: String },

    #[error(transparent)]
    Repository(#[from] grr_repository::RepositoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
