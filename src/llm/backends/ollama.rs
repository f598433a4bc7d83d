//! Local models served by Ollama.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Backend, BackendRequest, join_url};
use crate::error::GenerationError;
use crate::llm::http::{Transport, malformed, shorten};

const NAME: &str = "Ollama";

pub struct OllamaBackend {
    endpoint: String,
}

impl OllamaBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[async_trait]
impl Backend for OllamaBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn complete(
        &self,
        transport: &Transport,
        request: &BackendRequest<'_>,
    ) -> Result<String, GenerationError> {
        let url = join_url(&self.endpoint, "api/generate");
        let body = GenerateRequest {
            model: request.model,
            system: request.system_prompt,
            prompt: request.user_prompt,
            stream: false,
        };

        debug!("POST {} (model {})", url, request.model);
        let builder = transport.client().post(&url).json(&body);
        let text = transport.send(NAME, builder, None).await?;

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| malformed(NAME, format!("{}: {}", e, shorten(&text))))?;
        Ok(parsed.response)
    }
}

/// Names of the models installed in the local Ollama service.
pub async fn list_local_models(
    transport: &Transport,
    endpoint: &str,
) -> Result<Vec<String>, GenerationError> {
    let url = join_url(endpoint, "api/tags");
    debug!("GET {}", url);

    let text = transport
        .send(NAME, transport.client().get(&url), None)
        .await?;
    let parsed: TagsResponse = serde_json::from_str(&text)
        .map_err(|e| malformed(NAME, format!("{}: {}", e, shorten(&text))))?;

    Ok(parsed
        .models
        .into_iter()
        .map(|m| m.name)
        .filter(|name| !name.is_empty())
        .collect())
}
