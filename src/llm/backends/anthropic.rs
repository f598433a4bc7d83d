//! Anthropic Messages API (Claude).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Backend, BackendRequest, require_credential};
use crate::error::GenerationError;
use crate::llm::http::{Transport, malformed, shorten};

const NAME: &str = "Claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u64 = 1024;

pub struct AnthropicBackend {
    url: String,
}

impl AnthropicBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u64,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn complete(
        &self,
        transport: &Transport,
        request: &BackendRequest<'_>,
    ) -> Result<String, GenerationError> {
        let key = require_credential(NAME, request.credential)?;

        let body = ApiRequest {
            model: request.model,
            max_tokens: MAX_TOKENS,
            system: request.system_prompt,
            messages: vec![ApiMessage {
                role: "user",
                content: request.user_prompt,
            }],
        };

        debug!("POST {} (model {})", self.url, request.model);
        let builder = transport
            .client()
            .post(&self.url)
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let text = transport.send(NAME, builder, Some(key)).await?;

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| malformed(NAME, format!("{}: {}", e, shorten(&text))))?;

        let content = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if content.is_empty() {
            return Err(malformed(
                NAME,
                format!("empty response (stop_reason: {:?})", parsed.stop_reason),
            ));
        }
        Ok(content)
    }
}
