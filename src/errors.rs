// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis pipeline error: {0}")]
    Pipeline(String),

    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),
}

impl AnalysisError {
    /// Client faults are the caller's to fix and are never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::Decode(_) | AnalysisError::Validation(_))
    }
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AnalysisError::Decode(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Image decode error",
                "message": self.to_string()
            })),
            AnalysisError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            AnalysisError::Pipeline(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Image analysis error",
                    "message": self.to_string()
                }))
            }
            AnalysisError::Timeout(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Image analysis timeout",
                    "message": self.to_string()
                }))
            }
        }
    }
}

/// Raised inside the color profiler. Never leaves it: the profiler degrades to a
/// fallback profile instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorAnalysisError {
    #[error("buffer holds {actual} samples, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("hue histogram is empty")]
    EmptyHistogram,

    #[error("color statistics are not finite")]
    NonFinite,
}
