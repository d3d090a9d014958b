//! Deterministic fallback heuristics.
//!
//! Used whenever generation is unavailable, slow, or invalid. Everything here
//! is a pure function of the [`AnswerPayload`]: same answers, same output.

use super::model::{
    AnswerPayload, Cadence, ChangeStyle, CommitmentRecommendation, ProfileSummary, ProofMode,
};

/// Substitute for a missing focus domain.
pub const GENERIC_FOCUS: &str = "personal growth";

pub const INTENSIVE_PROFILE_NAME: &str = "Bold Builder";
pub const MICRO_PROFILE_NAME: &str = "Steady Starter";
pub const BALANCED_PROFILE_NAME: &str = "Balanced Achiever";

/// Focus tags that trigger the movement recommendation.
const MOVEMENT_KEYWORDS: &[&str] = &[
    "fitness", "health", "exercise", "movement", "workout", "body", "sport",
];

/// Tunable knobs for the recommendation fallback.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    /// How many items a micro change-style keeps, taken from the front.
    pub micro_limit: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { micro_limit: 2 }
    }
}

impl FallbackPolicy {
    /// Ordered fallback recommendations for a payload.
    pub fn recommend(&self, payload: &AnswerPayload) -> Vec<CommitmentRecommendation> {
        let focus = payload.primary_focus().unwrap_or(GENERIC_FOCUS);
        let mut items = Vec::with_capacity(4);

        if let Some(domain) = movement_domain(payload) {
            items.push(tick_only(
                "Daily Movement",
                "Move your body for at least ten minutes, any way you like.",
                Cadence::Daily,
                format!("You named {domain} as a focus, and short daily movement builds it fastest."),
            ));
        }

        items.push(tick_only(
            "Morning check-in",
            "Take two minutes each morning to pick one intention for the day.",
            Cadence::Daily,
            format!("A daily anchor keeps {focus} on your radar."),
        ));
        items.push(tick_only(
            "Evening reflection",
            "Before bed, note one thing that went well and one to adjust.",
            Cadence::Daily,
            "Reflecting each evening turns slips into lessons instead of streak breakers."
                .to_string(),
        ));
        items.push(tick_only(
            "Weekly review",
            "Once a week, look back at your check-ins and plan the week ahead.",
            Cadence::Weekly,
            "A weekly look back shows progress that single days hide.".to_string(),
        ));

        if payload.change_style_kind() == ChangeStyle::Micro {
            items.truncate(self.micro_limit.max(1));
        }
        items
    }
}

/// Fallback profile summary. Never has an empty section.
pub fn summarize_fallback(payload: &AnswerPayload) -> ProfileSummary {
    let focus = payload.primary_focus().unwrap_or(GENERIC_FOCUS);
    let style = payload.change_style_kind();

    let profile_name = match style {
        ChangeStyle::Intensive => INTENSIVE_PROFILE_NAME,
        ChangeStyle::Micro => MICRO_PROFILE_NAME,
        ChangeStyle::Balanced => BALANCED_PROFILE_NAME,
    };

    let strengths = vec![
        format!("You already know you want to make progress on {focus}."),
        "You are willing to be honest about what gets in your way.".to_string(),
        "You chose to start, which is the hardest step.".to_string(),
    ];

    let risk_zones = vec![
        match style {
            ChangeStyle::Intensive => "Taking on too much at once can lead to burnout.",
            ChangeStyle::Micro => "Very small steps can feel too easy to skip.",
            ChangeStyle::Balanced => "Busy weeks can push new habits to the side.",
        }
        .to_string(),
        "Missing one day can feel like losing the whole streak.".to_string(),
    ];

    let best_practices = vec![
        "Tie each habit to something you already do every day.".to_string(),
        "Check in at the same time each day so it becomes automatic.".to_string(),
        "Review your week and adjust instead of starting over.".to_string(),
    ];

    ProfileSummary {
        profile_name: profile_name.to_string(),
        strengths,
        risk_zones,
        best_practices,
    }
}

/// Fallback recommendations with the default policy.
pub fn recommend_fallback(payload: &AnswerPayload) -> Vec<CommitmentRecommendation> {
    FallbackPolicy::default().recommend(payload)
}

/// First focus domain that calls for movement.
fn movement_domain(payload: &AnswerPayload) -> Option<&str> {
    payload
        .focus_domains
        .iter()
        .find(|domain| {
            let lower = domain.to_lowercase();
            MOVEMENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .map(String::as_str)
}

fn tick_only(
    title: &str,
    description: &str,
    cadence: Cadence,
    reason: String,
) -> CommitmentRecommendation {
    CommitmentRecommendation {
        title: title.to_string(),
        short_description: description.to_string(),
        cadence,
        proof_mode: ProofMode::TickOnly,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{AnswerField, AnswerValue};

    fn payload(focus: &[&str], change_style: &str) -> AnswerPayload {
        let mut p = AnswerPayload::default();
        p.update(
            AnswerField::FocusDomains,
            AnswerValue::Tags(focus.iter().map(|s| s.to_string()).collect()),
        );
        p.update(AnswerField::ChangeStyle, AnswerValue::Text(change_style.to_string()));
        p
    }

    #[test]
    fn empty_payload_gets_balanced_profile() {
        let summary = summarize_fallback(&AnswerPayload::default());
        assert_eq!(summary.profile_name, BALANCED_PROFILE_NAME);
        assert!(summary.is_usable());
        assert!(summary.strengths[0].contains(GENERIC_FOCUS));
    }

    #[test]
    fn profile_name_follows_change_style() {
        assert_eq!(
            summarize_fallback(&payload(&[], "intensive")).profile_name,
            INTENSIVE_PROFILE_NAME
        );
        assert_eq!(
            summarize_fallback(&payload(&[], "micro")).profile_name,
            MICRO_PROFILE_NAME
        );
        assert_eq!(
            summarize_fallback(&payload(&[], "whatever")).profile_name,
            BALANCED_PROFILE_NAME
        );
    }

    #[test]
    fn only_one_sentence_uses_focus() {
        let summary = summarize_fallback(&payload(&["sleep"], ""));
        let mentions = summary
            .strengths
            .iter()
            .chain(&summary.risk_zones)
            .chain(&summary.best_practices)
            .filter(|s| s.contains("sleep"))
            .count();
        assert_eq!(mentions, 1);
    }

    #[test]
    fn summary_is_usable_for_every_style_and_focus_combo() {
        for style in ["", "intensive", "micro", "balanced"] {
            for focus in [&[][..], &["fitness"][..], &["career", "family", "sleep"][..]] {
                let summary = summarize_fallback(&payload(focus, style));
                assert!(summary.is_usable(), "style={style:?} focus={focus:?}");
            }
        }
    }

    #[test]
    fn summary_is_deterministic() {
        let p = payload(&["career"], "intensive");
        assert_eq!(summarize_fallback(&p), summarize_fallback(&p));
        assert_eq!(recommend_fallback(&p), recommend_fallback(&p));
    }

    #[test]
    fn base_list_has_three_tick_only_items() {
        let items = recommend_fallback(&AnswerPayload::default());
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Morning check-in", "Evening reflection", "Weekly review"]
        );
        assert!(items.iter().all(|i| i.proof_mode == ProofMode::TickOnly));
        assert!(items.iter().all(|i| !i.reason.is_empty()));
        assert_eq!(items[2].cadence, Cadence::Weekly);
    }

    #[test]
    fn fitness_focus_prepends_movement() {
        let items = recommend_fallback(&payload(&["career", "Fitness"], ""));
        assert_eq!(items.len(), 4);
        assert!(items[0].title.contains("Movement"));
        assert!(items[0].reason.contains("Fitness"));
        assert!(!items[0].reason.contains("career"));
        assert!(items[1].reason.contains("career"));
    }

    #[test]
    fn fitness_micro_truncates_to_two() {
        let items = recommend_fallback(&payload(&["fitness"], "micro"));
        assert_eq!(items.len(), 2);
        assert!(items[0].title.contains("Movement"));
        assert_eq!(items[1].title, "Morning check-in");
    }

    #[test]
    fn micro_limit_is_a_policy_parameter() {
        let policy = FallbackPolicy { micro_limit: 3 };
        assert_eq!(policy.recommend(&payload(&["health"], "micro")).len(), 3);
        assert_eq!(policy.recommend(&payload(&["health"], "balanced")).len(), 4);
    }

    #[test]
    fn zero_micro_limit_still_returns_one_item() {
        let policy = FallbackPolicy { micro_limit: 0 };
        assert_eq!(policy.recommend(&payload(&[], "micro")).len(), 1);
    }
}
