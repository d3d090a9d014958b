//! Error types for habitloop.

use std::time::Duration;

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Why a generation attempt produced no usable text.
///
/// Every variant is recoverable: callers fall back to the heuristic engine.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service not configured")]
    NotConfigured,

    #[error("generation timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("generation service returned an empty response")]
    EmptyResponse,

    #[error("generation call failed: {0}")]
    CallFailed(#[from] LlmError),
}

impl GenerationError {
    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::TimedOut { .. } => "timed_out",
            Self::EmptyResponse => "empty_response",
            Self::CallFailed(_) => "call_error",
        }
    }
}

/// A generated payload did not match the response contract.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("no JSON payload found in generation output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing or mistyped field `{field}`: {reason}")]
    Field { field: String, reason: String },

    #[error("section `{0}` is empty")]
    EmptySection(&'static str),
}

/// Why a generated result was replaced by the fallback.
#[derive(Debug, thiserror::Error)]
pub enum FallbackReason {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),
}

impl FallbackReason {
    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generation(e) => e.label(),
            Self::Contract(_) => "contract_violation",
        }
    }
}

/// Onboarding orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("recommendations requested before a profile summary is available")]
    MissingSummary,

    #[error("step {step} is incomplete: {reason}")]
    IncompleteStep { step: String, reason: String },

    #[error("cannot move from step {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("onboarding already complete")]
    AlreadyComplete,

    #[error("no recommendation at index {0}")]
    InvalidSelection(usize),

    #[error("generation backend request failed: {0}")]
    Backend(String),

    #[error("no commitment store configured")]
    NoStore,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
