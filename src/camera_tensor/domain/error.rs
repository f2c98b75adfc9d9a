use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Destination data type {0} is not supported")]
    UnsupportedType(String),

    #[error("Destination buffer holds {actual} elements, conversion needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid conversion parameters: {0}")]
    InvalidParameters(String),
}
