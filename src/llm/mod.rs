//! AI provider backends and commit message generation.

pub mod backends;
pub mod extract;
pub mod http;
pub mod prompt;
pub mod provider;
pub mod registry;

pub use extract::extract_message;
pub use provider::{Credential, Endpoints, ProviderConfig, ProviderKind, credential};
pub use registry::{GenerationRequest, ProviderRegistry};
