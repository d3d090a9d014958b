//! Response contract for generated onboarding payloads.
//!
//! Validation is all-or-nothing: a single missing or mistyped field rejects
//! the whole response.

use serde_json::Value;

use crate::error::ContractError;

use super::model::{Cadence, CommitmentRecommendation, ProfileSummary, ProofMode};

/// Upper bound on recommendations returned to the client.
pub const RECOMMENDATION_CAP: usize = 5;

/// Validate a generated profile summary.
///
/// Empty lists pass structurally; callers decide whether the result is
/// usable enough to show.
pub fn validate_profile(raw: &str) -> Result<ProfileSummary, ContractError> {
    let value = parse_object(raw)?;

    let profile_name = required_str(&value, "profile_name")?;
    if profile_name.trim().is_empty() {
        return Err(field_error("profile_name", "must not be empty"));
    }

    Ok(ProfileSummary {
        profile_name: profile_name.trim().to_string(),
        strengths: string_list(&value, "strengths")?,
        risk_zones: string_list(&value, "risk_zones")?,
        best_practices: string_list(&value, "best_practices")?,
    })
}

/// Validate a generated recommendation list.
///
/// Accepts `{"commitments": [...]}` or a bare array.
pub fn validate_recommendations(raw: &str) -> Result<Vec<CommitmentRecommendation>, ContractError> {
    let value = parse_json(raw)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("commitments") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(field_error("commitments", "expected an array")),
            None => return Err(field_error("commitments", "missing")),
        },
        _ => return Err(field_error("commitments", "expected an object or array")),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| recommendation(idx, item))
        .collect()
}

fn recommendation(idx: usize, item: &Value) -> Result<CommitmentRecommendation, ContractError> {
    if !item.is_object() {
        return Err(field_error(format!("commitments[{idx}]"), "expected an object"));
    }
    let path = |name: &str| format!("commitments[{idx}].{name}");
    let text = |name: &str| -> Result<String, ContractError> {
        let value = item
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| field_error(path(name), "expected a string"))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(field_error(path(name), "must not be empty"));
        }
        Ok(value.to_string())
    };

    let cadence: Cadence = text("cadence")?
        .parse()
        .map_err(|e: String| field_error(path("cadence"), e))?;
    let proof_mode: ProofMode = text("proof_mode")?
        .parse()
        .map_err(|e: String| field_error(path("proof_mode"), e))?;

    Ok(CommitmentRecommendation {
        title: text("title")?,
        short_description: text("short_description")?,
        cadence,
        proof_mode,
        reason: text("reason")?,
    })
}

fn parse_json(raw: &str) -> Result<Value, ContractError> {
    let json = extract_json(raw).ok_or(ContractError::NoJson)?;
    serde_json::from_str(json).map_err(|e| ContractError::InvalidJson(e.to_string()))
}

fn parse_object(raw: &str) -> Result<Value, ContractError> {
    let value = parse_json(raw)?;
    if !value.is_object() {
        return Err(ContractError::InvalidJson("expected a JSON object".to_string()));
    }
    Ok(value)
}

fn required_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, ContractError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| field_error(field, "expected a string"))
}

fn string_list(value: &Value, field: &str) -> Result<Vec<String>, ContractError> {
    let items = value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| field_error(field, "expected an array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| field_error(field, "expected an array of strings"))
        })
        .collect()
}

fn field_error(field: impl Into<String>, reason: impl Into<String>) -> ContractError {
    ContractError::Field {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Locate the JSON document in model output that may carry markdown fences
/// or surrounding prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return Some(inner);
            }
        }
    }

    // Prefer whichever bracket opens first.
    let open = trimmed.find(['{', '['])?;
    let close_char = if trimmed[open..].starts_with('{') { '}' } else { ']' };
    let close = trimmed.rfind(close_char)?;
    (close > open).then(|| &trimmed[open..=close])
}
