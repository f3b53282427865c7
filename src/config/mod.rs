pub mod assistant;

use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cli::Args;
use self::assistant::AssistantKind;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const HISTORY_WINDOW: usize = 10;
pub const TOP_K_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("top_k must be between {min} and {max}, got {value}")]
    TopKOutOfRange { value: u32, min: u32, max: u32 },
    #[error("temperature must be between {min} and {max}, got {value}")]
    TemperatureOutOfRange { value: f32, min: f32, max: f32 },
}

/// Whether a question may be sent while an upload batch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPolicy {
    #[default]
    BlockWhileEitherBusy,
    BlockWhileAsking,
}

/// Resolved once at startup and handed to the backend and the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub assistant: AssistantKind,
    pub top_k: u32,
    pub temperature: f32,
    pub student_name: Option<String>,
    pub history_window: usize,
    pub upload_status_ttl: Duration,
    pub send_policy: SendPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL is valid"),
            assistant: AssistantKind::default(),
            top_k: 5,
            temperature: 0.1,
            student_name: None,
            history_window: HISTORY_WINDOW,
            upload_status_ttl: Duration::from_secs(5),
            send_policy: SendPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&args.api_base_url)?;

        if !TOP_K_RANGE.contains(&args.top_k) {
            return Err(ConfigError::TopKOutOfRange {
                value: args.top_k,
                min: *TOP_K_RANGE.start(),
                max: *TOP_K_RANGE.end(),
            });
        }
        if !TEMPERATURE_RANGE.contains(&args.temperature) {
            return Err(ConfigError::TemperatureOutOfRange {
                value: args.temperature,
                min: *TEMPERATURE_RANGE.start(),
                max: *TEMPERATURE_RANGE.end(),
            });
        }

        let send_policy = if args.allow_send_while_uploading {
            SendPolicy::BlockWhileAsking
        } else {
            SendPolicy::BlockWhileEitherBusy
        };

        Ok(Self {
            base_url,
            assistant: args.assistant,
            top_k: args.top_k,
            temperature: args.temperature,
            student_name: args.student_name.clone().filter(|n| !n.trim().is_empty()),
            history_window: HISTORY_WINDOW,
            upload_status_ttl: Duration::from_secs(args.upload_status_ttl_secs),
            send_policy,
        })
    }

    /// Joins an absolute API path (e.g. `/api/ask`) onto the base address,
    /// keeping any path prefix the base already carries.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            self.base_url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    /// Base address as shown to the user, without a trailing slash.
    pub fn display_base(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "expected an http(s) base address".to_string(),
        });
    }
    Ok(url)
}
