pub mod http;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::models::chat::{ AskRequest, AskResponse };
use crate::models::upload::{ UploadFile, UploadResponse };

pub use self::http::HttpBackend;

/// Failure of a single backend call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, refused, reset).
    #[error("{0}")]
    Transport(String),
    /// A non-2xx response.
    #[error("{status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// The three calls the RAG backend exposes.
#[async_trait]
pub trait RagBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError>;

    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError>;

    async fn health(&self) -> Result<HealthResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = ApiError::Http {
            status: 413,
            status_text: "Payload Too Large".into(),
            body: "file exceeds limit".into(),
        };
        assert_eq!(err.to_string(), "413 Payload Too Large: file exceeds limit");
    }

    #[test]
    fn test_transport_error_display_is_raw_message() {
        assert_eq!(ApiError::Transport("Network Error".into()).to_string(), "Network Error");
    }
}
