//! Google Gemini `generateContent`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Backend, BackendRequest, join_url, require_credential};
use crate::error::GenerationError;
use crate::llm::http::{Transport, malformed, shorten};

const NAME: &str = "Gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiBackend {
    base_url: String,
}

impl GeminiBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl Backend for GeminiBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn complete(
        &self,
        transport: &Transport,
        request: &BackendRequest<'_>,
    ) -> Result<String, GenerationError> {
        let key = require_credential(NAME, request.credential)?;
        let url = join_url(
            &self.base_url,
            &format!("models/{}:generateContent", request.model),
        );

        let body = ApiRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system_prompt,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: request.user_prompt,
                }],
            }],
        };

        debug!("POST {}", url);
        let builder = transport
            .client()
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&body);
        let text = transport.send(NAME, builder, Some(key)).await?;

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| malformed(NAME, format!("{}: {}", e, shorten(&text))))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(malformed(NAME, "response has no candidate text"));
        }
        Ok(content)
    }
}
