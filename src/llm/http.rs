//! HTTP transport shared by the provider backends.
//!
//! Every failure is mapped onto [`GenerationError`] here so the backends only
//! deal with request and response shapes.

use std::env;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GenerationError;

/// Environment variable to override the configured request timeout.
pub const TIMEOUT_ENV_VAR: &str = "GITPOP_TIMEOUT";

const MAX_DETAIL_CHARS: usize = 300;

/// Get the request timeout.
///
/// `GITPOP_TIMEOUT` (whole seconds, greater than zero) wins over `configured`.
/// Invalid values are logged and ignored.
pub fn get_timeout(configured: Duration) -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using {}s",
                    TIMEOUT_ENV_VAR,
                    v,
                    configured.as_secs()
                );
                configured
            }
        },
        _ => configured,
    }
}

/// A reqwest client plus the timeout it was built with.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    timeout: Duration,
}

impl Transport {
    pub fn new(timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::ProviderFailed {
                provider: "HTTP client".to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` and return the body of a successful response.
    ///
    /// `secret` is scrubbed from any error detail built from the response.
    pub async fn send(
        &self,
        provider: &str,
        request: RequestBuilder,
        secret: Option<&str>,
    ) -> Result<String, GenerationError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(provider, e, secret))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(provider, e, secret))?;

        debug!(
            "{} responded with HTTP {} ({} bytes)",
            provider,
            status.as_u16(),
            body.len()
        );

        if !status.is_success() {
            return Err(map_status(provider, status, &body, secret));
        }
        Ok(body)
    }

    fn map_send_error(
        &self,
        provider: &str,
        e: reqwest::Error,
        secret: Option<&str>,
    ) -> GenerationError {
        if e.is_timeout() {
            GenerationError::ProviderTimeout {
                provider: provider.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            GenerationError::ProviderUnreachable {
                provider: provider.to_string(),
                detail: redact(&e.to_string(), secret),
            }
        } else {
            GenerationError::ProviderFailed {
                provider: provider.to_string(),
                detail: redact(&e.to_string(), secret),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object { message: String },
    Text(String),
}

/// Map a non-success HTTP status onto a [`GenerationError`].
pub fn map_status(
    provider: &str,
    status: StatusCode,
    body: &str,
    secret: Option<&str>,
) -> GenerationError {
    let provider = provider.to_string();
    let detail = redact(&format!("HTTP {}: {}", status.as_u16(), error_message(body)), secret);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::ProviderAuthError { provider, detail }
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::ProviderRateLimited { provider },
        _ => GenerationError::ProviderFailed { provider, detail },
    }
}

/// Pull a readable message out of an error body.
///
/// Understands the `{"error": {"message": ...}}` and `{"error": "..."}`
/// shapes the supported APIs use; anything else is shortened.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.error {
            ErrorDetail::Object { message } => message,
            ErrorDetail::Text(message) => message,
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    shorten(trimmed)
}

/// Cut text to a length suitable for an error message.
pub fn shorten(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_DETAIL_CHARS).collect();
    format!("{}...", cut)
}

/// Replace every occurrence of `secret` in `text`.
pub fn redact(text: &str, secret: Option<&str>) -> String {
    match secret.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => text.replace(secret, "[REDACTED]"),
        None => text.to_string(),
    }
}

/// Error for a reply that arrived but could not be used.
pub fn malformed(provider: &str, detail: impl Into<String>) -> GenerationError {
    GenerationError::MalformedResponse {
        provider: provider.to_string(),
        detail: detail.into(),
    }
}
