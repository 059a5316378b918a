// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestionError {
    #[error("Could not read image: {0}")]
    Unreadable(String),

    #[error(
        "Could not fetch image: {0}. Make sure the link points directly at an image, or download it and upload the file instead"
    )]
    FetchFailed(String),

    #[error(
        "The image host refused access: {0}. Download the image and upload the file instead"
    )]
    Blocked(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("History item already exists: {0}")]
    Duplicate(String),

    #[error("History item not found: {0}")]
    NotFound(String),

    #[error("History storage failure: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum LensError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error("Analysis service error: {0}")]
    Analysis(String),

    #[error("Analysis returned no usable result: {0}")]
    AnalysisParse(String),

    #[error("Image generation error: {0}")]
    Generation(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    #[error("Pipeline run was reset before it finished")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ResponseError for LensError {
    fn status_code(&self) -> StatusCode {
        match self {
            LensError::Ingestion(_) => StatusCode::BAD_REQUEST,
            LensError::Analysis(_) | LensError::Generation(_) => StatusCode::SERVICE_UNAVAILABLE,
            LensError::AnalysisParse(_) => StatusCode::BAD_GATEWAY,
            LensError::Persistence(PersistenceError::NotFound(_)) => StatusCode::NOT_FOUND,
            LensError::Persistence(PersistenceError::Duplicate(_)) => StatusCode::CONFLICT,
            LensError::InvalidState(_) | LensError::Cancelled => StatusCode::CONFLICT,
            LensError::Validation(_) => StatusCode::BAD_REQUEST,
            LensError::Persistence(_) | LensError::Config(_) | LensError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self {
            LensError::Ingestion(_) => "Image ingestion error",
            LensError::Analysis(_) | LensError::AnalysisParse(_) => "Analysis error",
            LensError::Generation(_) => "Generation error",
            LensError::Persistence(_) => "History error",
            LensError::InvalidState(_) | LensError::Cancelled => "Pipeline state error",
            LensError::Validation(_) => "Validation error",
            LensError::Config(_) => "Configuration error",
            LensError::Serialization(_) => "Data processing error",
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "message": self.to_string()
        }))
    }
}
