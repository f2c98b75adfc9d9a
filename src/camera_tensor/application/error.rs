use thiserror::Error;
use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Frame processing failed: {0}")]
    FrameProcessingFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Domain error occurred: {0}")]
    DomainError(#[from] DomainError),

    #[error("Infrastructure error occurred: {0}")]
    InfrastructureError(#[from] InfrastructureError),
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

fn domain_status(domain_err: &DomainError) -> StatusCode {
    match domain_err {
        DomainError::UnsupportedType(_)
        | DomainError::InvalidParameters(_)
        | DomainError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        DomainError::BufferSizeMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApplicationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationError::FrameProcessingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApplicationError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::DomainError(domain_err) => domain_status(domain_err),
            ApplicationError::InfrastructureError(infra_err) => match infra_err {
                InfrastructureError::FileNotFound(_) => StatusCode::NOT_FOUND,
                InfrastructureError::PathNotAllowed(_) => StatusCode::FORBIDDEN,
                InfrastructureError::UnsupportedScheme(_) => StatusCode::BAD_REQUEST,
                InfrastructureError::NotSupported(_) => StatusCode::NOT_IMPLEMENTED,
                InfrastructureError::ExternalApiError(_) | InfrastructureError::ReqwestError(_) => {
                    StatusCode::BAD_GATEWAY
                }
                InfrastructureError::DecodingError(_) | InfrastructureError::Base64DecodeError(_) => {
                    StatusCode::BAD_REQUEST
                }
                InfrastructureError::ImageLibError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                InfrastructureError::Domain(domain_err) => domain_status(domain_err),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!(target: "http", "{:?}", self);
        } else {
            log::warn!(target: "http", "{}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
