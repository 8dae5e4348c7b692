//! Line item routes: candidate search, apply-match, unmatch, and auto-match.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use rivena_core::allocation::MatchSource;
use rivena_db::repositories::allocation::ApplyMatchInput;
use rivena_db::{AllocationRepository, MatchingRepository, SettingsRepository};

use super::{data_response, error_response};
use crate::{middleware::AuthUser, AppState};

/// Creates the line item routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/line-items/{line_id}/candidates", get(candidates))
        .route("/line-items/{line_id}/matches", post(apply_match))
        .route("/line-items/{line_id}/unmatch", post(unmatch))
        .route(
            "/deposits/{deposit_id}/auto-match/preview",
            get(auto_match_preview),
        )
        .route(
            "/deposits/{deposit_id}/auto-match/apply",
            post(auto_match_apply),
        )
}

/// Query parameters for candidate search.
#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    /// Admit schedules dated after the deposit month window.
    #[serde(default)]
    pub include_future_schedules: bool,
}

/// Request body for apply-match.
#[derive(Debug, Deserialize)]
pub struct ApplyMatchRequest {
    /// Target revenue schedule.
    pub revenue_schedule_id: Uuid,
    /// Usage amount to allocate.
    pub usage_amount: Decimal,
    /// Commission amount to allocate.
    pub commission_amount: Decimal,
    /// Confidence recorded on the match.
    #[serde(default)]
    pub confidence_score: Decimal,
}

async fn candidates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(line_id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
) -> Response {
    let settings = match SettingsRepository::new(state.db.clone())
        .engine_settings(user.tenant_id(), user.user_id())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error_response(500, &e.to_string()),
    };

    let repo = MatchingRepository::new(state.db.clone());
    match repo
        .candidates_for_line(
            user.tenant_id(),
            line_id,
            &settings,
            query.include_future_schedules,
        )
        .await
    {
        Ok(candidates) => data_response(json!({ "candidates": candidates })),
        Err(e) => {
            error!(error = %e, line_id = %line_id, "candidate search failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn apply_match(
    State(state): State<AppState>,
    user: AuthUser,
    Path(line_id): Path<Uuid>,
    Json(body): Json<ApplyMatchRequest>,
) -> Response {
    let settings = match SettingsRepository::new(state.db.clone())
        .engine_settings(user.tenant_id(), user.user_id())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error_response(500, &e.to_string()),
    };

    let input = ApplyMatchInput {
        line_item_id: line_id,
        revenue_schedule_id: body.revenue_schedule_id,
        usage_amount: body.usage_amount,
        commission_amount: body.commission_amount,
        confidence_score: body.confidence_score,
        source: MatchSource::Manual,
    };

    let repo = AllocationRepository::new(state.db.clone());
    match repo
        .apply_match(user.tenant_id(), &input, settings.variance_tolerance)
        .await
    {
        Ok(outcome) => data_response(json!({
            "match": outcome.match_row,
            "flex_decision": {
                "action": outcome.decision.action.as_str(),
                "classification": outcome.decision.classification,
                "overage_usage": outcome.decision.overage_usage,
                "overage_commission": outcome.decision.overage_commission,
                "executed": outcome.decision.executed,
            },
            "adjustment_schedule_id": outcome.adjustment_schedule_id,
            "review_item_id": outcome.review_item_id,
            "line": outcome.line,
        })),
        Err(e) => {
            error!(error = %e, line_id = %line_id, "apply-match failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn unmatch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(line_id): Path<Uuid>,
) -> Response {
    let repo = AllocationRepository::new(state.db.clone());
    match repo.unmatch(user.tenant_id(), line_id).await {
        Ok(line) => data_response(json!({ "line": line })),
        Err(e) => {
            error!(error = %e, line_id = %line_id, "unmatch failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn auto_match_preview(
    State(state): State<AppState>,
    user: AuthUser,
    Path(deposit_id): Path<Uuid>,
) -> Response {
    let settings = match SettingsRepository::new(state.db.clone())
        .engine_settings(user.tenant_id(), user.user_id())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error_response(500, &e.to_string()),
    };

    let repo = MatchingRepository::new(state.db.clone());
    match repo
        .auto_match_preview(user.tenant_id(), deposit_id, &settings)
        .await
    {
        Ok(pairings) => data_response(json!({
            "pairings": pairings
                .iter()
                .map(|p| json!({
                    "line_item_id": p.line_item_id,
                    "revenue_schedule_id": p.revenue_schedule_id,
                    "confidence": p.confidence,
                    "match_type": p.match_type,
                }))
                .collect::<Vec<_>>(),
        })),
        Err(e) => {
            error!(error = %e, deposit_id = %deposit_id, "auto-match preview failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn auto_match_apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(deposit_id): Path<Uuid>,
) -> Response {
    let settings = match SettingsRepository::new(state.db.clone())
        .engine_settings(user.tenant_id(), user.user_id())
        .await
    {
        Ok(settings) => settings,
        Err(e) => return error_response(500, &e.to_string()),
    };

    // Selection is re-run server-side; client-proposed pairings are ignored.
    let matching = MatchingRepository::new(state.db.clone());
    let pairings = match matching
        .auto_match_preview(user.tenant_id(), deposit_id, &settings)
        .await
    {
        Ok(pairings) => pairings,
        Err(e) => return error_response(e.http_status_code(), &e.to_string()),
    };

    let repo = AllocationRepository::new(state.db.clone());
    match repo
        .auto_match_apply(user.tenant_id(), &pairings, settings.variance_tolerance)
        .await
    {
        Ok(outcomes) => data_response(json!({
            "applied": outcomes.len(),
            "matches": outcomes
                .iter()
                .map(|o| json!({
                    "match": o.match_row,
                    "flex_decision_action": o.decision.action.as_str(),
                    "line_id": o.line.id,
                }))
                .collect::<Vec<_>>(),
        })),
        Err(e) => {
            error!(error = %e, deposit_id = %deposit_id, "auto-match apply failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}
