//! Onboarding system — answers in, profile and starter commitments out.
//!
//! The server side (`service`, `routes`) turns an answer payload into a
//! profile summary and a short list of commitment recommendations, using
//! the LLM when it answers in time and a deterministic fallback otherwise.
//! The client side (`orchestrator`) walks the user through the screens and
//! prefetches generated content so the reveal never waits on the network.

pub mod contract;
pub mod fallback;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod routes;
pub mod service;
pub mod state;

pub use fallback::{FallbackPolicy, recommend_fallback, summarize_fallback};
pub use model::{
    AnswerField, AnswerPayload, AnswerValue, Cadence, CommitmentRecommendation, ProfileSummary,
    ProofMode, RawAnswerPayload, Source, Sourced,
};
pub use orchestrator::{
    Entitlements, GenerationBackend, HttpGenerationBackend, OnboardingOrchestrator,
    OrchestratorConfig,
};
pub use routes::{OnboardingRouteState, SOURCE_HEADER, onboarding_routes};
pub use service::OnboardingService;
pub use state::{GenerationSlot, GenerationStatus, OnboardingStep, UserNotice};
