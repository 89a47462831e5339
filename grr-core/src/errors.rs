use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid genomic position: {0}")]
    InvalidPosition(String),

    #[error("Empty reference or alternative sequence in allele {0}")]
    EmptyAlleleSequence(String),

    #[error("Can't parse annotatable: {0}")]
    AnnotatableParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
