//! REST endpoints for onboarding profile and recommendation generation.
//!
//! Both generation endpoints answer 200 whenever the body parses. The only
//! client-facing failure is an unparseable request.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use super::fallback::summarize_fallback;
use super::model::{AnswerPayload, RawAnswerPayload, RecommendationList, RecommendationRequest};
use super::service::OnboardingService;

/// Response header naming where the body came from (`server` or `fallback`).
pub const SOURCE_HEADER: &str = "x-generation-source";

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub service: Arc<OnboardingService>,
    /// Billing-gated checks are bypassed when set.
    pub free_mode: bool,
}

fn bad_request(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "Rejected malformed onboarding request");
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": rejection.body_text() })),
    )
        .into_response()
}

/// POST /onboarding/summary
async fn post_summary(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<RawAnswerPayload>, JsonRejection>,
) -> Response {
    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    let payload = AnswerPayload::from(raw);

    let result = state.service.summarize(&payload).await;
    debug!(source = %result.source, "Serving profile summary");
    ([(SOURCE_HEADER, result.source.as_str())], Json(result.value)).into_response()
}

/// POST /onboarding/recommendations
///
/// A missing summary is replaced by the payload's fallback summary.
async fn post_recommendations(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    let payload = AnswerPayload::from(request.payload);
    let summary = request.summary.unwrap_or_else(|| {
        warn!("Recommendations requested without a summary, substituting fallback summary");
        summarize_fallback(&payload)
    });

    let result = state.service.recommend(&payload, &summary).await;
    debug!(source = %result.source, count = result.value.len(), "Serving recommendations");
    (
        [(SOURCE_HEADER, result.source.as_str())],
        Json(RecommendationList {
            commitments: result.value,
        }),
    )
        .into_response()
}

/// GET /health
async fn health(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "habitloop-onboarding",
        "generation_configured": state.service.generation_configured(),
        "free_mode": state.free_mode,
    }))
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/onboarding/summary", post(post_summary))
        .route("/onboarding/recommendations", post(post_recommendations))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
