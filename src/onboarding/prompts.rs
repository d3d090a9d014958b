//! Generation prompts for the profile summary and recommendations.

use crate::llm::{GenerationKind, GenerationRequest};

use super::contract::RECOMMENDATION_CAP;
use super::model::{AnswerPayload, ProfileSummary};

const SHARED_RULES: &str = "\
Rules:
- Write in plain, encouraging language. Each string must be under 20 words.
- Ground every statement in the user's answers. Do not invent facts about them.
- Never make medical, psychological, or diagnostic claims, and never suggest treatment.
- Respond with ONLY valid JSON matching the schema. No markdown, no explanation.";

/// Build the profile summary request.
pub fn profile_request(payload: &AnswerPayload) -> GenerationRequest {
    let system = format!(
        "You are the onboarding coach for a habit-tracking app. From a new user's \
         onboarding answers, write a short behavioral profile.\n\n\
         Output schema:\n\
         {{\n  \
           \"profile_name\": \"2-4 word label for this user's style\",\n  \
           \"strengths\": [\"2-3 strings\"],\n  \
           \"risk_zones\": [\"2-3 strings\"],\n  \
           \"best_practices\": [\"2-3 strings\"]\n\
         }}\n\n\
         {SHARED_RULES}"
    );

    GenerationRequest {
        kind: GenerationKind::Profile,
        system,
        prompt: format!("Onboarding answers:\n{}", answers_section(payload)),
    }
}

/// Build the recommendations request. The summary must already exist.
pub fn recommendation_request(
    payload: &AnswerPayload,
    summary: &ProfileSummary,
) -> GenerationRequest {
    let system = format!(
        "You are the onboarding coach for a habit-tracking app. Suggest up to \
         {RECOMMENDATION_CAP} starter commitments, most important first.\n\n\
         Output schema:\n\
         {{\n  \
           \"commitments\": [\n    {{\n      \
             \"title\": \"short habit name\",\n      \
             \"short_description\": \"one sentence\",\n      \
             \"cadence\": \"daily\" | \"weekly\",\n      \
             \"proof_mode\": \"none\" | \"tick_only\" | \"photo_optional\" | \"photo_required\",\n      \
             \"reason\": \"why this fits the user, citing their answers\"\n    \
           }}\n  \
           ]\n\
         }}\n\n\
         Match proof_mode to the accountability level: light prefers none or tick_only, \
         strict may use photo proof.\n\
         {SHARED_RULES}"
    );

    let prompt = format!(
        "Onboarding answers:\n{}\n\nProfile:\n{}",
        answers_section(payload),
        summary_section(summary)
    );

    GenerationRequest {
        kind: GenerationKind::Recommendations,
        system,
        prompt,
    }
}

fn answers_section(payload: &AnswerPayload) -> String {
    let list = |items: &[String]| {
        if items.is_empty() {
            "(not answered)".to_string()
        } else {
            items.join(", ")
        }
    };
    let single = |value: &str| {
        if value.is_empty() {
            "(not answered)".to_string()
        } else {
            value.to_string()
        }
    };

    [
        format!("- Life roles: {}", list(&payload.life_roles)),
        format!("- Active pressures: {}", list(&payload.active_pressures)),
        format!("- Focus domains: {}", list(&payload.focus_domains)),
        format!("- Struggle patterns: {}", list(&payload.struggle_patterns)),
        format!("- Reward styles: {}", list(&payload.reward_styles)),
        format!("- Change style: {}", single(&payload.change_style)),
        format!("- Current emotional state: {}", single(&payload.emotional_state)),
        format!("- Tone preferences: {}", list(&payload.tone_preferences)),
        format!(
            "- Accountability level: {}",
            single(&payload.accountability_level)
        ),
    ]
    .join("\n")
}

fn summary_section(summary: &ProfileSummary) -> String {
    format!(
        "- Name: {}\n- Strengths: {}\n- Risk zones: {}\n- Best practices: {}",
        summary.profile_name,
        summary.strengths.join("; "),
        summary.risk_zones.join("; "),
        summary.best_practices.join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{AnswerField, AnswerValue};

    #[test]
    fn profile_request_includes_answers_and_schema() {
        let mut payload = AnswerPayload::default();
        payload.update(
            AnswerField::FocusDomains,
            AnswerValue::Tags(vec!["fitness".into(), "sleep".into()]),
        );
        let req = profile_request(&payload);
        assert_eq!(req.kind, GenerationKind::Profile);
        assert!(req.system.contains("\"profile_name\""));
        assert!(req.system.contains("risk_zones"));
        assert!(req.system.contains("diagnostic"));
        assert!(req.prompt.contains("Focus domains: fitness, sleep"));
        assert!(req.prompt.contains("Change style: (not answered)"));
    }

    #[test]
    fn recommendation_request_includes_summary_and_enums() {
        let summary = ProfileSummary {
            profile_name: "Steady Starter".into(),
            strengths: vec!["Consistent".into()],
            risk_zones: vec!["Overcommits".into()],
            best_practices: vec!["Start small".into()],
        };
        let req = recommendation_request(&AnswerPayload::default(), &summary);
        assert_eq!(req.kind, GenerationKind::Recommendations);
        assert!(req.system.contains("photo_required"));
        assert!(req.system.contains("\"weekly\""));
        assert!(req.system.contains("up to 5"));
        assert!(req.prompt.contains("Name: Steady Starter"));
        assert!(req.prompt.contains("Risk zones: Overcommits"));
    }
}
