//! One module per provider wire format.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::http::Transport;
use super::provider::Credential;
use crate::error::GenerationError;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use ollama::{OllamaBackend, list_local_models};
pub use openai::OpenAiBackend;

/// Everything a backend needs for one call.
pub struct BackendRequest<'a> {
    pub system_prompt: &'a str,
    /// Sanitized diff wrapped in the user prompt.
    pub user_prompt: &'a str,
    pub model: &'a str,
    pub credential: Option<&'a Credential>,
}

/// A provider API that turns a prompt into raw completion text.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Provider name for messages and errors.
    fn name(&self) -> &'static str;

    /// Return the model's raw text. Post-processing happens in the caller.
    async fn complete(
        &self,
        transport: &Transport,
        request: &BackendRequest<'_>,
    ) -> Result<String, GenerationError>;
}

/// The credential as plain text, or an auth error if it is missing or blank.
pub(crate) fn require_credential<'a>(
    provider: &str,
    credential: Option<&'a Credential>,
) -> Result<&'a str, GenerationError> {
    match credential.map(|c| c.expose_secret().trim()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(GenerationError::ProviderAuthError {
            provider: provider.to_string(),
            detail: "no API key configured".to_string(),
        }),
    }
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
