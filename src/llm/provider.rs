//! Provider selection and per-provider settings.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretBox};

use crate::commit::DEFAULT_DIFF_BUDGET;

pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Default request timeout for a single generation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Secret API credential. Its `Debug` output is redacted.
pub type Credential = SecretBox<String>;

/// Wrap a plain string as a [`Credential`].
pub fn credential(value: impl Into<String>) -> Credential {
    SecretBox::new(Box::new(value.into()))
}

/// Supported AI backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    /// Ollama on the local machine. Needs no credential.
    Local,
    OpenAiCompatible { base_url: String },
    Gemini,
    Claude,
    /// Any other OpenAI-compatible chat-completions service.
    Custom { base_url: String },
}

impl ProviderKind {
    /// Human-readable name used in messages and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "Ollama",
            ProviderKind::OpenAiCompatible { .. } => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Claude => "Claude",
            ProviderKind::Custom { .. } => "Custom endpoint",
        }
    }

    /// Identifier used in the settings file.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::OpenAiCompatible { .. } => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Claude => "claude",
            ProviderKind::Custom { .. } => "custom",
        }
    }

    /// Build a kind from its settings identifier.
    ///
    /// `base_url` is used by `openai` (falling back to the public API) and
    /// is required by `custom`.
    pub fn from_key(key: &str, base_url: Option<&str>) -> Result<Self, String> {
        let base_url = base_url.map(str::trim).filter(|u| !u.is_empty());
        match key.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAiCompatible {
                base_url: base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL).to_string(),
            }),
            "gemini" => Ok(ProviderKind::Gemini),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "custom" => match base_url {
                Some(url) => Ok(ProviderKind::Custom {
                    base_url: url.to_string(),
                }),
                None => Err("the custom provider needs base_url".to_string()),
            },
            other => Err(format!(
                "unknown provider '{}' (expected local, openai, gemini, claude or custom)",
                other
            )),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        match self {
            ProviderKind::OpenAiCompatible { base_url } | ProviderKind::Custom { base_url } => {
                Some(base_url)
            }
            _ => None,
        }
    }

    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }

    /// Model used when the settings do not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Local => "llama3.2",
            ProviderKind::OpenAiCompatible { .. } | ProviderKind::Custom { .. } => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Claude => "claude-sonnet-4-5",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service locations that are not part of the provider variant itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Ollama base URL.
    pub local: String,
    pub gemini: String,
    pub anthropic: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            local: DEFAULT_LOCAL_ENDPOINT.to_string(),
            gemini: DEFAULT_GEMINI_BASE_URL.to_string(),
            anthropic: DEFAULT_ANTHROPIC_URL.to_string(),
        }
    }
}

/// The active AI backend configuration.
#[derive(Debug)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub credential: Option<Credential>,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub diff_budget: usize,
    /// Generate a message when committing without one.
    pub auto_generate: bool,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        let model = kind.default_model().to_string();
        Self {
            kind,
            model,
            credential: None,
            endpoints: Endpoints::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            diff_budget: DEFAULT_DIFF_BUDGET,
            auto_generate: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_credential(mut self, value: impl Into<String>) -> Self {
        self.credential = Some(credential(value));
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when a non-empty credential is configured.
    pub fn has_credential(&self) -> bool {
        self.credential
            .as_ref()
            .is_some_and(|c| !c.expose_secret().trim().is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderKind::Local)
    }
}

impl Clone for ProviderConfig {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            model: self.model.clone(),
            credential: self
                .credential
                .as_ref()
                .map(|c| credential(c.expose_secret().clone())),
            endpoints: self.endpoints.clone(),
            timeout: self.timeout,
            diff_budget: self.diff_budget,
            auto_generate: self.auto_generate,
        }
    }
}
