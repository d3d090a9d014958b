//! Client-side onboarding orchestrator.
//!
//! Drives the screen sequence, prefetches the profile summary before the
//! reveal screen, and keeps exactly one live generation attempt per slot.
//! Generation runs in spawned tasks; every state change bumps a revision
//! counter that observers can watch.
//!
//! Forward progress never blocks on generation: a client-side timeout or a
//! backend failure settles the slot with locally computed fallback content.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::time::error::Elapsed;
use tracing::{debug, info, warn};

use crate::error::OnboardingError;
use crate::llm::GenerationKind;
use crate::store::{Commitment, CommitmentStore, NewCommitment};

use super::fallback::{FallbackPolicy, summarize_fallback};
use super::model::{
    AnswerField, AnswerPayload, AnswerValue, CommitmentRecommendation, ProfileSummary, ProofMode,
    RecommendationList, Source, Sourced,
};
use super::routes::SOURCE_HEADER;
use super::service::OnboardingService;
use super::state::{GenerationSlot, GenerationStatus, OnboardingStep, UserNotice};

/// Where the orchestrator gets generated content from.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn summarize(
        &self,
        payload: &AnswerPayload,
    ) -> Result<Sourced<ProfileSummary>, OnboardingError>;

    async fn recommend(
        &self,
        payload: &AnswerPayload,
        summary: &ProfileSummary,
    ) -> Result<Sourced<Vec<CommitmentRecommendation>>, OnboardingError>;
}

/// In-process backend. Never fails.
#[async_trait]
impl GenerationBackend for OnboardingService {
    async fn summarize(
        &self,
        payload: &AnswerPayload,
    ) -> Result<Sourced<ProfileSummary>, OnboardingError> {
        Ok(OnboardingService::summarize(self, payload).await)
    }

    async fn recommend(
        &self,
        payload: &AnswerPayload,
        summary: &ProfileSummary,
    ) -> Result<Sourced<Vec<CommitmentRecommendation>>, OnboardingError> {
        Ok(OnboardingService::recommend(self, payload, summary).await)
    }
}

/// Backend talking to the onboarding REST endpoints.
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct RecommendationBody<'a> {
    payload: &'a AnswerPayload,
    summary: &'a ProfileSummary,
}

impl HttpGenerationBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OnboardingError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| OnboardingError::Backend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<Sourced<R>, OnboardingError>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| OnboardingError::Backend(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OnboardingError::Backend(format!(
                "{path} returned {status}: {text}"
            )));
        }

        // Servers that predate the header only ever served generated content.
        let source = response
            .headers()
            .get(SOURCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Source>().ok())
            .unwrap_or(Source::Server);

        let value = response
            .json::<R>()
            .await
            .map_err(|e| OnboardingError::Backend(format!("{path}: invalid body: {e}")))?;
        Ok(Sourced { source, value })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn summarize(
        &self,
        payload: &AnswerPayload,
    ) -> Result<Sourced<ProfileSummary>, OnboardingError> {
        self.post("/onboarding/summary", payload).await
    }

    async fn recommend(
        &self,
        payload: &AnswerPayload,
        summary: &ProfileSummary,
    ) -> Result<Sourced<Vec<CommitmentRecommendation>>, OnboardingError> {
        let body = RecommendationBody { payload, summary };
        let list: Sourced<RecommendationList> =
            self.post("/onboarding/recommendations", &body).await?;
        Ok(Sourced {
            source: list.source,
            value: list.value.commitments,
        })
    }
}

/// Billing state relevant to onboarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Entitlements {
    /// Bypass every billing gate.
    pub free_mode: bool,
    pub premium: bool,
}

impl Entitlements {
    pub fn allows_photo_proof(&self) -> bool {
        self.free_mode || self.premium
    }

    /// Downgrade a proof mode the user is not entitled to.
    pub fn gate(&self, mode: ProofMode) -> ProofMode {
        if mode.uses_photo() && !self.allows_photo_proof() {
            ProofMode::TickOnly
        } else {
            mode
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Client-side bound on one backend call.
    pub request_timeout: Duration,
    pub policy: FallbackPolicy,
    pub entitlements: Entitlements,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            policy: FallbackPolicy::default(),
            entitlements: Entitlements::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    step: OnboardingStep,
    answers: AnswerPayload,
    profile: GenerationSlot<ProfileSummary>,
    recommendations: GenerationSlot<Vec<CommitmentRecommendation>>,
    /// Parallel to the held recommendations.
    selected: Vec<bool>,
}

struct Inner {
    backend: Arc<dyn GenerationBackend>,
    store: Option<Arc<dyn CommitmentStore>>,
    config: OrchestratorConfig,
    session: RwLock<Session>,
    revision: watch::Sender<u64>,
}

impl Inner {
    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// One user's onboarding session.
#[derive(Clone)]
pub struct OnboardingOrchestrator {
    inner: Arc<Inner>,
}

impl OnboardingOrchestrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Option<Arc<dyn CommitmentStore>>,
        config: OrchestratorConfig,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                config,
                session: RwLock::new(Session::default()),
                revision,
            }),
        }
    }

    /// Receiver that changes whenever any session state changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub async fn step(&self) -> OnboardingStep {
        self.inner.session.read().await.step
    }

    pub async fn answers(&self) -> AnswerPayload {
        self.inner.session.read().await.answers.clone()
    }

    pub async fn profile(&self) -> GenerationSlot<ProfileSummary> {
        self.inner.session.read().await.profile.clone()
    }

    pub async fn recommendations(&self) -> GenerationSlot<Vec<CommitmentRecommendation>> {
        self.inner.session.read().await.recommendations.clone()
    }

    pub async fn selection(&self) -> Vec<bool> {
        self.inner.session.read().await.selected.clone()
    }

    /// Replace one answer field.
    pub async fn update_answer(&self, field: AnswerField, value: AnswerValue) {
        self.inner.session.write().await.answers.update(field, value);
        self.inner.bump();
    }

    /// Move to the next screen.
    ///
    /// Bounded list screens refuse to advance outside their bounds. Entering
    /// `Recommendations` uses the profile held for the current answers,
    /// waiting only when there is none, and then requests recommendations.
    /// The final step is reached through [`Self::complete`].
    pub async fn advance(&self) -> Result<OnboardingStep, OnboardingError> {
        let (current, next) = {
            let session = self.inner.session.read().await;
            let current = session.step;
            let next = current.next().ok_or(OnboardingError::AlreadyComplete)?;
            check_bounds(current, &session.answers)?;
            (current, next)
        };

        if next.is_terminal() {
            return Err(OnboardingError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if next == OnboardingStep::Recommendations {
            self.prefetch_profile().await;
            let held = {
                let session = self.inner.session.read().await;
                let key = session.answers.cache_key();
                session.profile.value_for(&key).is_some()
            };
            if !held && self.wait_profile().await.is_none() {
                return Err(OnboardingError::MissingSummary);
            }
        }

        {
            let mut session = self.inner.session.write().await;
            if !session.step.can_transition_to(next) {
                return Err(OnboardingError::InvalidTransition {
                    from: session.step.to_string(),
                    to: next.to_string(),
                });
            }
            session.step = next;
        }
        self.inner.bump();
        debug!(from = %current, to = %next, "Onboarding step advanced");

        if next.prefetches_profile() {
            self.prefetch_profile().await;
        }
        if next == OnboardingStep::Recommendations {
            self.request_recommendations().await?;
        }
        Ok(next)
    }

    /// Start a profile attempt unless one was already started for the
    /// current answers. A settled failure is not retried here; see
    /// [`Self::retry_profile`].
    pub async fn prefetch_profile(&self) {
        let mut session = self.inner.session.write().await;
        let key = session.answers.cache_key();
        if session.profile.covers(&key) {
            debug!(attempt = session.profile.attempt, "Profile already covered, skipping prefetch");
            return;
        }
        self.start_profile(&mut session, key);
    }

    /// Always start a new profile attempt, superseding any running one.
    pub async fn retry_profile(&self) {
        let mut session = self.inner.session.write().await;
        let key = session.answers.cache_key();
        self.start_profile(&mut session, key);
    }

    /// Wait for the current profile attempt to settle.
    ///
    /// Returns `None` if no attempt was ever started.
    pub async fn wait_profile(&self) -> Option<Sourced<ProfileSummary>> {
        self.wait_slot(|s| &s.profile).await
    }

    /// Request recommendations for the held summary.
    ///
    /// No-op if an attempt was already started for the current answers and
    /// the summary they were generated from.
    pub async fn request_recommendations(&self) -> Result<(), OnboardingError> {
        let mut session = self.inner.session.write().await;
        let summary = held_summary(&session)?;
        let key = recommendations_key(&session.answers, &summary);
        if session.recommendations.covers(&key) {
            return Ok(());
        }
        self.start_recommendations(&mut session, key, summary);
        Ok(())
    }

    /// Always start a new recommendations attempt.
    pub async fn retry_recommendations(&self) -> Result<(), OnboardingError> {
        let mut session = self.inner.session.write().await;
        let summary = held_summary(&session)?;
        let key = recommendations_key(&session.answers, &summary);
        self.start_recommendations(&mut session, key, summary);
        Ok(())
    }

    pub async fn wait_recommendations(&self) -> Option<Sourced<Vec<CommitmentRecommendation>>> {
        self.wait_slot(|s| &s.recommendations).await
    }

    /// Flip whether a recommendation is selected. Returns the new state.
    pub async fn toggle_selection(&self, index: usize) -> Result<bool, OnboardingError> {
        let selected = {
            let mut session = self.inner.session.write().await;
            let slot = session
                .selected
                .get_mut(index)
                .ok_or(OnboardingError::InvalidSelection(index))?;
            *slot = !*slot;
            *slot
        };
        self.inner.bump();
        Ok(selected)
    }

    /// Notice for the slot relevant to the current screen.
    pub async fn notice(&self) -> UserNotice {
        let session = self.inner.session.read().await;
        match session.step {
            OnboardingStep::Recommendations => session.recommendations.notice(),
            _ => session.profile.notice(),
        }
    }

    /// Persist the selected recommendations for `user_id` and reset.
    ///
    /// Photo proof modes are downgraded unless the user is entitled to them.
    pub async fn complete(&self, user_id: &str) -> Result<Vec<Commitment>, OnboardingError> {
        let store = self.inner.store.clone().ok_or(OnboardingError::NoStore)?;

        let chosen: Vec<CommitmentRecommendation> = {
            let session = self.inner.session.read().await;
            if session.step != OnboardingStep::Recommendations {
                return Err(OnboardingError::InvalidTransition {
                    from: session.step.to_string(),
                    to: OnboardingStep::Complete.to_string(),
                });
            }
            let held = session
                .recommendations
                .value
                .as_ref()
                .map(|v| v.value.as_slice())
                .unwrap_or_default();
            held.iter()
                .zip(&session.selected)
                .filter(|(_, selected)| **selected)
                .map(|(rec, _)| rec.clone())
                .collect()
        };

        if chosen.is_empty() {
            return Err(OnboardingError::IncompleteStep {
                step: OnboardingStep::Recommendations.to_string(),
                reason: "select at least one commitment".to_string(),
            });
        }

        let entitlements = self.inner.config.entitlements;
        let mut created = Vec::with_capacity(chosen.len());
        for rec in &chosen {
            let mut new = NewCommitment::from_recommendation(user_id, rec);
            new.proof_mode = entitlements.gate(rec.proof_mode);
            if new.proof_mode != rec.proof_mode {
                debug!(title = %rec.title, "Photo proof not entitled, using tick_only");
            }
            created.push(store.create_commitment(new).await?);
        }

        info!(user_id, count = created.len(), "Onboarding complete");
        self.reset().await;
        Ok(created)
    }

    /// Clear the session. Attempt counters keep counting so that tasks
    /// started before the reset cannot settle the new session.
    pub async fn reset(&self) {
        {
            let mut session = self.inner.session.write().await;
            let profile_attempt = session.profile.attempt;
            let recommendations_attempt = session.recommendations.attempt;
            *session = Session::default();
            session.profile.attempt = profile_attempt;
            session.recommendations.attempt = recommendations_attempt;
        }
        self.inner.bump();
    }

    fn start_profile(&self, session: &mut Session, key: String) {
        let attempt = session.profile.begin(key);
        let payload = session.answers.clone();
        let inner = Arc::clone(&self.inner);
        self.inner.bump();
        info!(attempt, "Profile generation started");

        tokio::spawn(async move {
            let timeout = inner.config.request_timeout;
            let outcome = tokio::time::timeout(timeout, inner.backend.summarize(&payload)).await;
            let (status, value) = resolve(GenerationKind::Profile, outcome, timeout, || {
                summarize_fallback(&payload)
            });

            let settled = inner.session.write().await.profile.settle(attempt, status, value);
            if settled {
                inner.bump();
            } else {
                debug!(attempt, "Discarding superseded profile attempt");
            }
        });
    }

    fn start_recommendations(&self, session: &mut Session, key: String, summary: ProfileSummary) {
        let attempt = session.recommendations.begin(key);
        let payload = session.answers.clone();
        let inner = Arc::clone(&self.inner);
        self.inner.bump();
        info!(attempt, "Recommendation generation started");

        tokio::spawn(async move {
            let timeout = inner.config.request_timeout;
            let outcome =
                tokio::time::timeout(timeout, inner.backend.recommend(&payload, &summary)).await;
            let (status, value) = resolve(GenerationKind::Recommendations, outcome, timeout, || {
                inner.config.policy.recommend(&payload)
            });
            let count = value.value.len();

            let settled = {
                let mut session = inner.session.write().await;
                let settled = session.recommendations.settle(attempt, status, value);
                if settled {
                    session.selected = vec![true; count];
                }
                settled
            };
            if settled {
                inner.bump();
            } else {
                debug!(attempt, "Discarding superseded recommendations attempt");
            }
        });
    }

    async fn wait_slot<T: Clone>(
        &self,
        pick: impl Fn(&Session) -> &GenerationSlot<T>,
    ) -> Option<Sourced<T>> {
        let mut rx = self.inner.revision.subscribe();
        loop {
            {
                let session = self.inner.session.read().await;
                let slot = pick(&session);
                if slot.status == GenerationStatus::Idle {
                    return None;
                }
                if slot.status.is_settled() {
                    return slot.value.clone();
                }
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

fn check_bounds(step: OnboardingStep, answers: &AnswerPayload) -> Result<(), OnboardingError> {
    let Some(field) = step.field() else {
        return Ok(());
    };
    let Some((min, max)) = field.bounds() else {
        return Ok(());
    };
    let count = answers.answer_count(field);
    if count < min || count > max {
        return Err(OnboardingError::IncompleteStep {
            step: step.to_string(),
            reason: format!("{field} needs {min}-{max} selections, got {count}"),
        });
    }
    Ok(())
}

fn held_summary(session: &Session) -> Result<ProfileSummary, OnboardingError> {
    session
        .profile
        .value
        .as_ref()
        .map(|s| s.value.clone())
        .ok_or(OnboardingError::MissingSummary)
}

/// Recommendations depend on the summary as well as the answers.
fn recommendations_key(answers: &AnswerPayload, summary: &ProfileSummary) -> String {
    format!("{}:{}", answers.cache_key(), summary.cache_key())
}

/// Turn a bounded backend call into the slot's next status and value.
fn resolve<T>(
    kind: GenerationKind,
    outcome: Result<Result<Sourced<T>, OnboardingError>, Elapsed>,
    timeout: Duration,
    fallback: impl FnOnce() -> T,
) -> (GenerationStatus, Sourced<T>) {
    match outcome {
        Ok(Ok(value)) => (GenerationStatus::Succeeded(value.source), value),
        Ok(Err(e)) => {
            warn!(%kind, error = %e, "Generation backend failed, using local fallback");
            (GenerationStatus::Failed, Sourced::fallback(fallback()))
        }
        Err(_) => {
            warn!(
                %kind,
                timeout_ms = timeout.as_millis() as u64,
                "Generation backend timed out, using local fallback"
            );
            (GenerationStatus::TimedOut, Sourced::fallback(fallback()))
        }
    }
}
