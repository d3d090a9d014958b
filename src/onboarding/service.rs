//! OnboardingService — generate, validate, or fall back.
//!
//! Both operations share one shape: build a prompt, make one bounded
//! generation attempt, validate the output against the contract, and
//! substitute the deterministic fallback on any failure. Neither operation
//! returns an error.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ContractError, FallbackReason, GenerationError};
use crate::llm::GenerationClient;

use super::contract::{RECOMMENDATION_CAP, validate_profile, validate_recommendations};
use super::fallback::{FallbackPolicy, summarize_fallback};
use super::model::{AnswerPayload, CommitmentRecommendation, ProfileSummary, Sourced};
use super::prompts::{profile_request, recommendation_request};

/// Stateless profile/recommendation generator.
pub struct OnboardingService {
    client: GenerationClient,
    policy: FallbackPolicy,
}

impl OnboardingService {
    pub fn new(client: GenerationClient, policy: FallbackPolicy) -> Self {
        Self { client, policy }
    }

    pub fn generation_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Profile summary for a payload. Always usable.
    pub async fn summarize(&self, payload: &AnswerPayload) -> Sourced<ProfileSummary> {
        let started = Instant::now();
        let outcome = self.try_summarize(payload).await;
        match outcome {
            Ok(summary) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Profile summary generated"
                );
                Sourced::server(summary)
            }
            Err(reason) => {
                log_fallback("profile", &reason, started);
                Sourced::fallback(summarize_fallback(payload))
            }
        }
    }

    /// Recommendations for a payload and its summary. Never empty.
    pub async fn recommend(
        &self,
        payload: &AnswerPayload,
        summary: &ProfileSummary,
    ) -> Sourced<Vec<CommitmentRecommendation>> {
        let started = Instant::now();
        match self.try_recommend(payload, summary).await {
            Ok(items) => {
                info!(
                    count = items.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recommendations generated"
                );
                Sourced::server(items)
            }
            Err(reason) => {
                log_fallback("recommendations", &reason, started);
                Sourced::fallback(self.policy.recommend(payload))
            }
        }
    }

    async fn try_summarize(&self, payload: &AnswerPayload) -> Result<ProfileSummary, FallbackReason> {
        let raw = self.client.generate(profile_request(payload)).await?;
        let summary = validate_profile(&raw)?;
        if let Some(section) = first_empty_section(&summary) {
            return Err(ContractError::EmptySection(section).into());
        }
        Ok(summary)
    }

    async fn try_recommend(
        &self,
        payload: &AnswerPayload,
        summary: &ProfileSummary,
    ) -> Result<Vec<CommitmentRecommendation>, FallbackReason> {
        let raw = self
            .client
            .generate(recommendation_request(payload, summary))
            .await?;
        let mut items = validate_recommendations(&raw)?;
        if items.is_empty() {
            return Err(ContractError::EmptySection("commitments").into());
        }
        items.truncate(RECOMMENDATION_CAP);
        Ok(items)
    }
}

fn first_empty_section(summary: &ProfileSummary) -> Option<&'static str> {
    if summary.strengths.is_empty() {
        Some("strengths")
    } else if summary.risk_zones.is_empty() {
        Some("risk_zones")
    } else if summary.best_practices.is_empty() {
        Some("best_practices")
    } else {
        None
    }
}

fn log_fallback(kind: &str, reason: &FallbackReason, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if matches!(reason, FallbackReason::Generation(GenerationError::NotConfigured)) {
        debug!(kind, "Generation not configured, using fallback");
    } else {
        warn!(
            kind,
            reason = reason.label(),
            error = %reason,
            elapsed_ms,
            "Generation unusable, using fallback"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::llm::generation::tests::CannedLlm;
    use crate::llm::GenerationConfig;
    use crate::onboarding::fallback::{BALANCED_PROFILE_NAME, recommend_fallback};
    use crate::onboarding::model::{AnswerField, AnswerValue, Cadence, ProofMode, Source};

    fn service_with(reply: &str) -> OnboardingService {
        OnboardingService::new(
            GenerationClient::new(Some(CannedLlm::ok(reply)), GenerationConfig::default()),
            FallbackPolicy::default(),
        )
    }

    fn unconfigured() -> OnboardingService {
        OnboardingService::new(GenerationClient::disabled(), FallbackPolicy::default())
    }

    fn fitness_micro() -> AnswerPayload {
        let mut p = AnswerPayload::default();
        p.update(AnswerField::FocusDomains, AnswerValue::Text("fitness".into()));
        p.update(AnswerField::ChangeStyle, AnswerValue::Text("micro".into()));
        p
    }

    const GOOD_PROFILE: &str = r#"{"profile_name":"Morning Mover","strengths":["Energetic"],"risk_zones":["Overreach"],"best_practices":["Start slow"]}"#;

    #[tokio::test]
    async fn server_profile_is_used_when_valid() {
        let result = service_with(GOOD_PROFILE)
            .summarize(&AnswerPayload::default())
            .await;
        assert_eq!(result.source, Source::Server);
        assert_eq!(result.value.profile_name, "Morning Mover");
    }

    #[tokio::test]
    async fn unconfigured_summary_is_identical_across_calls() {
        let service = unconfigured();
        let payload = fitness_micro();
        let first = service.summarize(&payload).await;
        let second = service.summarize(&payload).await;
        assert!(first.is_fallback());
        assert_eq!(
            serde_json::to_vec(&first.value).unwrap(),
            serde_json::to_vec(&second.value).unwrap()
        );
    }

    #[tokio::test]
    async fn missing_strengths_falls_back() {
        let raw = r#"{"profile_name":"Partial","risk_zones":["a"],"best_practices":["b"]}"#;
        let result = service_with(raw).summarize(&AnswerPayload::default()).await;
        assert!(result.is_fallback());
        assert_eq!(result.value.profile_name, BALANCED_PROFILE_NAME);
        assert!(result.value.is_usable());
    }

    #[tokio::test]
    async fn empty_section_falls_back() {
        let raw = r#"{"profile_name":"Hollow","strengths":[],"risk_zones":["a"],"best_practices":["b"]}"#;
        let result = service_with(raw).summarize(&AnswerPayload::default()).await;
        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn call_error_falls_back() {
        let service = OnboardingService::new(
            GenerationClient::new(Some(CannedLlm::failing("503")), GenerationConfig::default()),
            FallbackPolicy::default(),
        );
        let result = service.summarize(&AnswerPayload::default()).await;
        assert!(result.is_fallback());
    }

    #[tokio::test]
    async fn slow_generation_falls_back_within_timeout() {
        let config = GenerationConfig {
            timeout: Duration::from_millis(50),
            simulated_delay: Some(Duration::from_secs(5)),
            ..GenerationConfig::default()
        };
        let service = OnboardingService::new(
            GenerationClient::new(Some(CannedLlm::ok(GOOD_PROFILE)), config),
            FallbackPolicy::default(),
        );
        let started = Instant::now();
        let result = service.summarize(&AnswerPayload::default()).await;
        assert!(result.is_fallback());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn server_recommendations_are_capped() {
        let item = serde_json::json!({
            "title": "Stretch",
            "short_description": "Five minutes.",
            "cadence": "daily",
            "proof_mode": "photo_required",
            "reason": "You sit a lot."
        });
        let items = vec![item; 8];
        let raw = serde_json::json!({ "commitments": items }).to_string();
        let result = service_with(&raw)
            .recommend(&AnswerPayload::default(), &summarize_fallback(&AnswerPayload::default()))
            .await;
        assert_eq!(result.source, Source::Server);
        assert_eq!(result.value.len(), RECOMMENDATION_CAP);
        assert_eq!(result.value[0].proof_mode, ProofMode::PhotoRequired);
    }

    #[tokio::test]
    async fn empty_recommendations_fall_back() {
        let payload = fitness_micro();
        let result = service_with(r#"{"commitments":[]}"#)
            .recommend(&payload, &summarize_fallback(&payload))
            .await;
        assert!(result.is_fallback());
        assert_eq!(result.value, recommend_fallback(&payload));
    }

    #[tokio::test]
    async fn fallback_recommendations_use_enum_values() {
        let payload = fitness_micro();
        let result = unconfigured()
            .recommend(&payload, &summarize_fallback(&payload))
            .await;
        assert!(result.is_fallback());
        assert_eq!(result.value.len(), 2);
        assert!(result.value[0].title.contains("Movement"));
        assert!(result.value.iter().all(|i| matches!(i.cadence, Cadence::Daily | Cadence::Weekly)));
    }
}
