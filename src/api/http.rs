use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, Response, header::{ HeaderValue, CONTENT_TYPE } };
use reqwest::multipart::{ Form, Part };
use serde::de::DeserializeOwned;
use url::Url;

use super::{ ApiError, HealthResponse, RagBackend };
use crate::config::ClientConfig;
use crate::models::chat::{ AskRequest, AskResponse };
use crate::models::upload::{ UploadFile, UploadResponse };

const UPLOAD_PATH: &str = "/api/upload";
const HEALTH_PATH: &str = "/api/health";

/// reqwest implementation of the backend contract. Endpoint URLs are
/// resolved once from the config; no timeout or retry is layered on top
/// of the transport defaults.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: HttpClient,
    ask_url: Url,
    upload_url: Url,
    health_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(HttpClient::new(), config)
    }

    pub fn with_client(http: HttpClient, config: &ClientConfig) -> Self {
        Self {
            http,
            ask_url: config.endpoint(config.assistant.ask_path()),
            upload_url: config.endpoint(UPLOAD_PATH),
            health_url: config.endpoint(HEALTH_PATH),
        }
    }

    pub fn ask_url(&self) -> &Url {
        &self.ask_url
    }
}

fn json_content_type() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Body text of an error response; a body that cannot be read is reported
/// in its place.
fn error_body<E: std::fmt::Display>(read: Result<String, E>) -> String {
    read.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {}", e);
        format!("<unreadable body: {}>", e)
    })
}

/// Turns a non-2xx response into `ApiError::Http`, otherwise decodes JSON.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = error_body(resp.text().await);
        return Err(ApiError::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice::<T>(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl RagBackend for HttpBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        debug!(
            "POST {} (history={}, top_k={}, temperature={})",
            self.ask_url,
            request.history.len(),
            request.top_k,
            request.temperature
        );
        let resp = self.http.post(self.ask_url.clone()).json(request).send().await?;
        read_json(resp).await
    }

    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        debug!("POST {} ({}, {} bytes)", self.upload_url, file.name, file.bytes.len());
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part("file", part);
        let resp = self.http.post(self.upload_url.clone()).multipart(form).send().await?;
        read_json(resp).await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        debug!("GET {}", self.health_url);
        let resp = self.http
            .get(self.health_url.clone())
            .header(CONTENT_TYPE, json_content_type())
            .send().await?;
        read_json(resp).await
    }
}
