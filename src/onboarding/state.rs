//! Onboarding state machines: the screen sequence and the generation lifecycle.

use serde::{Deserialize, Serialize};

use super::model::{AnswerField, Source, Sourced};

/// The onboarding screens, in order.
///
/// Progresses linearly: Welcome → one screen per answer field →
/// ProfileReveal → Recommendations → Complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    Welcome,
    LifeRoles,
    Pressures,
    FocusDomains,
    Struggles,
    RewardStyle,
    ChangeStyle,
    EmotionalState,
    Tone,
    Accountability,
    ProfileReveal,
    Recommendations,
    Complete,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        self.next() == Some(target)
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Welcome => Some(LifeRoles),
            LifeRoles => Some(Pressures),
            Pressures => Some(FocusDomains),
            FocusDomains => Some(Struggles),
            Struggles => Some(RewardStyle),
            RewardStyle => Some(ChangeStyle),
            ChangeStyle => Some(EmotionalState),
            EmotionalState => Some(Tone),
            Tone => Some(Accountability),
            Accountability => Some(ProfileReveal),
            ProfileReveal => Some(Recommendations),
            Recommendations => Some(Complete),
            Complete => None,
        }
    }

    /// The answer field this screen collects, if it is a question screen.
    pub fn field(&self) -> Option<AnswerField> {
        use OnboardingStep::*;
        match self {
            LifeRoles => Some(AnswerField::LifeRoles),
            Pressures => Some(AnswerField::ActivePressures),
            FocusDomains => Some(AnswerField::FocusDomains),
            Struggles => Some(AnswerField::StrugglePatterns),
            RewardStyle => Some(AnswerField::RewardStyles),
            ChangeStyle => Some(AnswerField::ChangeStyle),
            EmotionalState => Some(AnswerField::EmotionalState),
            Tone => Some(AnswerField::TonePreferences),
            Accountability => Some(AnswerField::AccountabilityLevel),
            Welcome | ProfileReveal | Recommendations | Complete => None,
        }
    }

    /// Entering this step starts (or confirms) the profile prefetch.
    pub fn prefetches_profile(&self) -> bool {
        matches!(self, Self::Accountability | Self::ProfileReveal)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::LifeRoles => "life_roles",
            Self::Pressures => "pressures",
            Self::FocusDomains => "focus_domains",
            Self::Struggles => "struggles",
            Self::RewardStyle => "reward_style",
            Self::ChangeStyle => "change_style",
            Self::EmotionalState => "emotional_state",
            Self::Tone => "tone",
            Self::Accountability => "accountability",
            Self::ProfileReveal => "profile_reveal",
            Self::Recommendations => "recommendations",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle of one generation slot.
///
/// `Idle → Running → {Succeeded(source) | Failed | TimedOut}`; any settled
/// state may go back to `Running` on retry or when the answers change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "source", rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Running,
    Succeeded(Source),
    Failed,
    TimedOut,
}

impl GenerationStatus {
    pub fn can_transition_to(&self, target: GenerationStatus) -> bool {
        use GenerationStatus::*;
        match (self, target) {
            (_, Running) => true,
            (Running, Succeeded(_) | Failed | TimedOut) => true,
            _ => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed | Self::TimedOut)
    }
}

/// What the UI should tell the user about a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserNotice {
    /// Showing server-generated content, or nothing yet.
    None,
    /// Fallback content is showing and no retry is running.
    UsingQuickPicks,
    /// The last attempt timed out; offer "retry now".
    TakingLonger,
}

/// One cached, replaceable generation result.
#[derive(Debug, Clone)]
pub struct GenerationSlot<T> {
    pub status: GenerationStatus,
    /// Cache key of the answers the current attempt was started for.
    pub cache_key: Option<String>,
    /// Monotonic attempt counter; only the latest attempt may settle the slot.
    pub attempt: u64,
    pub value: Option<Sourced<T>>,
    /// Cache key `value` was produced for.
    pub settled_key: Option<String>,
}

impl<T> Default for GenerationSlot<T> {
    fn default() -> Self {
        Self {
            status: GenerationStatus::Idle,
            cache_key: None,
            attempt: 0,
            value: None,
            settled_key: None,
        }
    }
}

impl<T> GenerationSlot<T> {
    /// Start a new attempt for `cache_key`, returning its attempt number.
    ///
    /// The previous value stays visible until the new attempt settles.
    pub fn begin(&mut self, cache_key: String) -> u64 {
        self.attempt += 1;
        self.status = GenerationStatus::Running;
        self.cache_key = Some(cache_key);
        self.attempt
    }

    /// Settle `attempt`. Returns false (and changes nothing) if it is stale.
    pub fn settle(&mut self, attempt: u64, status: GenerationStatus, value: Sourced<T>) -> bool {
        if attempt != self.attempt || !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        self.value = Some(value);
        self.settled_key = self.cache_key.clone();
        true
    }

    /// Whether an attempt for `cache_key` has already been started.
    ///
    /// Settled failures count: only a changed key or an idle slot calls for
    /// a new attempt, and re-attempts go through an explicit retry.
    pub fn covers(&self, cache_key: &str) -> bool {
        self.cache_key.as_deref() == Some(cache_key) && self.status != GenerationStatus::Idle
    }

    /// The held value, if it was produced for `cache_key`.
    pub fn value_for(&self, cache_key: &str) -> Option<&Sourced<T>> {
        self.value
            .as_ref()
            .filter(|_| self.settled_key.as_deref() == Some(cache_key))
    }

    pub fn notice(&self) -> UserNotice {
        match self.status {
            GenerationStatus::TimedOut => UserNotice::TakingLonger,
            GenerationStatus::Running => UserNotice::None,
            _ if self.value.as_ref().is_some_and(Sourced::is_fallback) => {
                UserNotice::UsingQuickPicks
            }
            _ => UserNotice::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_all_steps() {
        let mut current = OnboardingStep::Welcome;
        let mut count = 0;
        while let Some(next) = current.next() {
            assert!(current.can_transition_to(next));
            current = next;
            count += 1;
        }
        assert_eq!(current, OnboardingStep::Complete);
        assert_eq!(count, 12);
    }

    #[test]
    fn invalid_step_transitions() {
        use OnboardingStep::*;
        assert!(!Welcome.can_transition_to(FocusDomains));
        assert!(!Tone.can_transition_to(ChangeStyle));
        assert!(!Complete.can_transition_to(Welcome));
        assert!(!Tone.can_transition_to(Tone));
    }

    #[test]
    fn question_steps_cover_every_field() {
        let mut step = OnboardingStep::Welcome;
        let mut fields = Vec::new();
        loop {
            if let Some(field) = step.field() {
                fields.push(field);
            }
            match step.next() {
                Some(next) => step = next,
                None => break,
            }
        }
        assert_eq!(fields, AnswerField::ALL.to_vec());
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [Welcome, RewardStyle, ProfileReveal, Complete] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json);
        }
    }

    #[test]
    fn status_transitions() {
        use GenerationStatus::*;
        assert!(Idle.can_transition_to(Running));
        assert!(Running.can_transition_to(Succeeded(Source::Server)));
        assert!(Running.can_transition_to(TimedOut));
        assert!(TimedOut.can_transition_to(Running));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Succeeded(Source::Fallback)));
    }

    #[test]
    fn stale_attempt_cannot_settle() {
        let mut slot: GenerationSlot<u32> = GenerationSlot::default();
        let first = slot.begin("k".into());
        let second = slot.begin("k".into());
        assert!(!slot.settle(first, GenerationStatus::Succeeded(Source::Server), Sourced::server(1)));
        assert!(slot.value.is_none());
        assert!(slot.settle(second, GenerationStatus::Succeeded(Source::Server), Sourced::server(2)));
        assert_eq!(slot.value.as_ref().unwrap().value, 2);
        assert!(!slot.settle(second, GenerationStatus::Failed, Sourced::fallback(3)));
    }

    #[test]
    fn covers_any_started_attempt_for_key() {
        let mut slot: GenerationSlot<u32> = GenerationSlot::default();
        assert!(!slot.covers("k"));
        let attempt = slot.begin("k".into());
        assert!(slot.covers("k"));
        assert!(!slot.covers("other"));
        slot.settle(attempt, GenerationStatus::TimedOut, Sourced::fallback(0));
        assert!(slot.covers("k"));
        assert!(!slot.covers("other"));
    }

    #[test]
    fn value_for_tracks_settled_key() {
        let mut slot: GenerationSlot<u32> = GenerationSlot::default();
        let first = slot.begin("a".into());
        slot.settle(first, GenerationStatus::Failed, Sourced::fallback(1));
        assert_eq!(slot.value_for("a").map(|v| v.value), Some(1));

        slot.begin("b".into());
        assert!(slot.value.is_some());
        assert!(slot.value_for("b").is_none());
        assert_eq!(slot.value_for("a").map(|v| v.value), Some(1));
    }

    #[test]
    fn notice_distinguishes_fallback_and_timeout() {
        let mut slot: GenerationSlot<u32> = GenerationSlot::default();
        assert_eq!(slot.notice(), UserNotice::None);

        let a = slot.begin("k".into());
        slot.settle(a, GenerationStatus::TimedOut, Sourced::fallback(0));
        assert_eq!(slot.notice(), UserNotice::TakingLonger);

        let b = slot.begin("k".into());
        assert_eq!(slot.notice(), UserNotice::None);
        slot.settle(b, GenerationStatus::Succeeded(Source::Fallback), Sourced::fallback(0));
        assert_eq!(slot.notice(), UserNotice::UsingQuickPicks);

        let c = slot.begin("k".into());
        slot.settle(c, GenerationStatus::Succeeded(Source::Server), Sourced::server(1));
        assert_eq!(slot.notice(), UserNotice::None);
    }

    #[test]
    fn status_serializes_with_source() {
        let json = serde_json::to_value(GenerationStatus::Succeeded(Source::Fallback)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "succeeded", "source": "fallback"}));
        let json = serde_json::to_value(GenerationStatus::TimedOut).unwrap();
        assert_eq!(json, serde_json::json!({"status": "timed_out"}));
    }
}
