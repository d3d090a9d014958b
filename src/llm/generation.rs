//! Generation client — one bounded text-generation attempt.
//!
//! Wraps an optional [`LlmProvider`]. With no provider configured every call
//! returns [`GenerationError::NotConfigured`] without touching the network.
//! Otherwise a single completion is raced against the configured timeout.
//! The client never retries; callers decide what to do with a failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Default generation timeout.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_millis(12_000);

/// Which onboarding artifact a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Profile,
    Recommendations,
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile => write!(f, "profile"),
            Self::Recommendations => write!(f, "recommendations"),
        }
    }
}

/// A fully-built generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    /// Instruction template including the required output shape.
    pub system: String,
    /// User data interpolated into the prompt.
    pub prompt: String,
}

/// Tuning for generation calls.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Wall-clock bound on one attempt, including any simulated delay.
    pub timeout: Duration,
    /// Artificial latency injected before the call (slow-path testing).
    pub simulated_delay: Option<Duration>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_GENERATION_TIMEOUT,
            simulated_delay: None,
            temperature: 0.4,
            max_tokens: 900,
        }
    }
}

/// Client that issues at most one generation call per request.
pub struct GenerationClient {
    provider: Option<Arc<dyn LlmProvider>>,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    /// A client with no provider; every call falls through immediately.
    pub fn disabled() -> Self {
        Self::new(None, GenerationConfig::default())
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Run one generation attempt and return the raw text.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let Some(provider) = self.provider.as_ref() else {
            return Err(GenerationError::NotConfigured);
        };

        let completion = CompletionRequest::new(vec![
            ChatMessage::system(request.system),
            ChatMessage::user(request.prompt),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_json_output();

        let started = Instant::now();
        let simulated_delay = self.config.simulated_delay;
        let attempt = async {
            if let Some(delay) = simulated_delay {
                debug!(delay_ms = delay.as_millis() as u64, "Applying simulated generation delay");
                tokio::time::sleep(delay).await;
            }
            provider.complete(completion).await
        };

        let response = match tokio::time::timeout(self.config.timeout, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GenerationError::TimedOut {
                    timeout: self.config.timeout,
                });
            }
        };

        let (input_price, output_price) = provider.cost_per_token();
        let cost = input_price * Decimal::from(response.input_tokens)
            + output_price * Decimal::from(response.output_tokens);
        info!(
            kind = %request.kind,
            model = provider.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %cost.round_dp(6),
            "Generation call finished"
        );

        let content = response.content.trim();
        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}
