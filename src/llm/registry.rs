//! Dispatch of a generation request to the configured provider.

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::backends::{
    AnthropicBackend, Backend, BackendRequest, GeminiBackend, OllamaBackend, OpenAiBackend,
    list_local_models,
};
use super::extract::extract_message;
use super::http::{Transport, get_timeout, malformed};
use super::prompt::{SYSTEM_PROMPT, build_user_prompt, sanitize_diff};
use super::provider::{ProviderConfig, ProviderKind};
use crate::error::GenerationError;

/// One request for a commit message.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub diff_text: &'a str,
    pub config: &'a ProviderConfig,
}

/// Routes requests to provider backends, one at a time.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    in_flight: Mutex<()>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a commit message for `request.diff_text`.
    ///
    /// A call made while another is still running fails immediately with
    /// [`GenerationError::GenerationInProgress`]. Nothing is retried.
    pub async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| GenerationError::GenerationInProgress)?;

        let config = request.config;
        let backend = backend_for(config);
        let transport = Transport::new(get_timeout(config.timeout))?;

        let diff = sanitize_diff(request.diff_text);
        let user_prompt = build_user_prompt(&diff);
        debug!(
            "Dispatching {} byte prompt to {} (model {}, timeout {}s)",
            user_prompt.len(),
            backend.name(),
            config.model,
            transport.timeout().as_secs()
        );

        let raw = backend
            .complete(
                &transport,
                &BackendRequest {
                    system_prompt: SYSTEM_PROMPT,
                    user_prompt: &user_prompt,
                    model: &config.model,
                    credential: config.credential.as_ref(),
                },
            )
            .await?;

        let message = extract_message(&raw)
            .ok_or_else(|| malformed(backend.name(), "the reply contained no commit message"))?;
        info!("{} generated a {} byte commit message", backend.name(), message.len());
        Ok(message)
    }

    /// Models installed in the local Ollama service at `config`'s endpoint.
    pub async fn local_models(&self, config: &ProviderConfig) -> Result<Vec<String>, GenerationError> {
        let transport = Transport::new(get_timeout(config.timeout))?;
        list_local_models(&transport, &config.endpoints.local).await
    }
}

fn backend_for(config: &ProviderConfig) -> Box<dyn Backend> {
    match &config.kind {
        ProviderKind::Local => Box::new(OllamaBackend::new(config.endpoints.local.as_str())),
        ProviderKind::OpenAiCompatible { base_url } => {
            Box::new(OpenAiBackend::new(config.kind.as_str(), base_url))
        }
        ProviderKind::Custom { base_url } => {
            Box::new(OpenAiBackend::new(config.kind.as_str(), base_url))
        }
        ProviderKind::Gemini => Box::new(GeminiBackend::new(config.endpoints.gemini.as_str())),
        ProviderKind::Claude => {
            Box::new(AnthropicBackend::new(config.endpoints.anthropic.as_str()))
        }
    }
}
