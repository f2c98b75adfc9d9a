use std::path::PathBuf;

use thiserror::Error;
use crate::domain::error::DomainError;

#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("File {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    #[error("Image processing failed: {0}")]
    ImageProcessingError(String),

    #[error("File storage error: {0}")]
    FileStorageError(String),

    #[error("External API call failed: {0}")]
    ExternalApiError(String),

    #[error("File {0} is outside the snapshot directory")]
    PathNotAllowed(PathBuf),

    #[error("Unsupported snapshot URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Data decoding failed: {0}")]
    DecodingError(String),

    #[error("Underlying image library error: {0}")]
    ImageLibError(#[from] image::ImageError),

    #[error("Underlying I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
