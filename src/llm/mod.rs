//! LLM integration for habitloop.
//!
//! - `provider`: the backend-agnostic [`LlmProvider`] trait.
//! - `openai`: Chat Completions over `reqwest`.
//! - `generation`: the timeout-bounded [`GenerationClient`] used by onboarding.

pub mod generation;
pub mod openai;
pub mod provider;

pub use generation::{
    DEFAULT_GENERATION_TIMEOUT, GenerationClient, GenerationConfig, GenerationKind,
    GenerationRequest,
};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::*;

use std::sync::Arc;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub base_url: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::OpenAi => {
            let provider = OpenAiProvider::new(OpenAiConfig {
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            })?;
            tracing::info!("Using OpenAI (model: {})", config.model);
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_openai_provider() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
        };
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().model_name(), "gpt-4o-mini");
    }
}
