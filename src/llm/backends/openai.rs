//! OpenAI chat-completions shape, used by OpenAI and custom endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Backend, BackendRequest, require_credential};
use crate::error::GenerationError;
use crate::llm::http::{Transport, malformed, shorten};

const COMPLETIONS_PATH: &str = "/chat/completions";

pub struct OpenAiBackend {
    name: &'static str,
    url: String,
}

impl OpenAiBackend {
    /// `base_url` may or may not already end in `/chat/completions`.
    pub fn new(name: &'static str, base_url: &str) -> Self {
        Self {
            name,
            url: completions_url(base_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn completions_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.ends_with(COMPLETIONS_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, COMPLETIONS_PATH)
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(
        &self,
        transport: &Transport,
        request: &BackendRequest<'_>,
    ) -> Result<String, GenerationError> {
        let key = require_credential(self.name, request.credential)?;

        let body = ApiRequest {
            model: request.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                ApiMessage {
                    role: "user",
                    content: request.user_prompt,
                },
            ],
        };

        debug!("POST {} (model {})", self.url, request.model);
        let builder = transport
            .client()
            .post(&self.url)
            .bearer_auth(key)
            .json(&body);
        let text = transport.send(self.name, builder, Some(key)).await?;

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| malformed(self.name, format!("{}: {}", e, shorten(&text))))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| malformed(self.name, "response has no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_suffix_added() {
        assert_eq!(
            completions_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8080/v1/"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_completions_suffix_not_duplicated() {
        assert_eq!(
            completions_url("http://llm.internal/v1/chat/completions"),
            "http://llm.internal/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://llm.internal/v1/chat/completions/"),
            "http://llm.internal/v1/chat/completions"
        );
    }
}
