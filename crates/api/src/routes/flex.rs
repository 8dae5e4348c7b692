//! Flex routes: review queue and dispute resolution.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use rivena_core::flex::FlexAction;
use rivena_db::entities::flex_review_items;
use rivena_db::entities::sea_orm_active_enums::FlexReviewStatus;
use rivena_db::FlexRepository;

use super::{data_response, error_response};
use crate::{middleware::AuthUser, AppState};

/// Creates the flex routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flex/queue", get(list_queue))
        .route("/flex/queue/{item_id}/assign", post(assign))
        .route(
            "/flex/queue/{item_id}/approve-and-apply",
            post(approve_and_apply),
        )
        .route("/flex/schedules/{schedule_id}/resolve", post(resolve))
}

/// Query parameters for the queue listing.
#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Optional status filter ("open" | "approved").
    pub status: Option<String>,
}

/// Request body for an assignment.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Assign the item to the caller.
    #[serde(default)]
    pub assign_to_me: bool,
    /// Explicit assignee; ignored when `assign_to_me` is set.
    pub user_id: Option<Uuid>,
}

/// Request body for a resolution.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Resolution action.
    pub action: FlexAction,
    /// Corrected commission rate for adjust/propagation actions.
    pub corrected_rate: Option<Decimal>,
    /// Propagate the corrected rate to future schedules of the product.
    #[serde(default)]
    pub apply_to_future: bool,
}

/// Stable queue listing shape.
#[derive(Debug, Serialize)]
pub struct QueueItemResponse {
    /// Review item id.
    pub id: Uuid,
    /// Target schedule.
    pub revenue_schedule_id: Uuid,
    /// Variance classification.
    pub flex_classification: String,
    /// Item status.
    pub status: String,
    /// Creation timestamp, string-serialized.
    pub created_at: String,
}

impl From<&flex_review_items::Model> for QueueItemResponse {
    fn from(item: &flex_review_items::Model) -> Self {
        Self {
            id: item.id,
            revenue_schedule_id: item.revenue_schedule_id,
            flex_classification: serde_json::to_value(&item.flex_classification)
                .ok()
                .and_then(|v| v.as_str().map(ToString::to_string))
                .unwrap_or_default(),
            status: serde_json::to_value(&item.status)
                .ok()
                .and_then(|v| v.as_str().map(ToString::to_string))
                .unwrap_or_default(),
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

async fn list_queue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<QueueQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        Some("open") => Some(FlexReviewStatus::Open),
        Some("approved") => Some(FlexReviewStatus::Approved),
        Some(other) => return error_response(400, &format!("Unknown status: {other}")),
        None => None,
    };

    let repo = FlexRepository::new(state.db.clone());
    match repo.list_queue(user.tenant_id(), status).await {
        Ok(items) => {
            let items: Vec<QueueItemResponse> = items.iter().map(Into::into).collect();
            data_response(json!({ "items": items }))
        }
        Err(e) => {
            error!(error = %e, "queue listing failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn assign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(body): Json<AssignRequest>,
) -> Response {
    let assignee = if body.assign_to_me {
        user.user_id()
    } else {
        match body.user_id {
            Some(user_id) => user_id,
            None => return error_response(400, "Either assign_to_me or user_id is required"),
        }
    };

    let repo = FlexRepository::new(state.db.clone());
    match repo.assign(user.tenant_id(), item_id, assignee).await {
        Ok(item) => data_response(json!({ "item": item })),
        Err(e) => {
            error!(error = %e, item_id = %item_id, "assignment failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn approve_and_apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Response {
    let repo = FlexRepository::new(state.db.clone());
    match repo.approve_and_apply(user.tenant_id(), item_id).await {
        Ok(item) => data_response(json!({ "item": item })),
        Err(e) => {
            error!(error = %e, item_id = %item_id, "approve-and-apply failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn resolve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(schedule_id): Path<Uuid>,
    Json(body): Json<ResolveRequest>,
) -> Response {
    let repo = FlexRepository::new(state.db.clone());
    match repo
        .resolve(
            user.tenant_id(),
            schedule_id,
            body.action,
            body.corrected_rate,
            body.apply_to_future,
        )
        .await
    {
        Ok(outcome) => data_response(json!({
            "base_schedule_id": outcome.base_schedule_id,
            "adjustment_schedule_id": outcome.adjustment_schedule_id,
            "disputed_schedule_ids": outcome.disputed_schedule_ids,
            "future_schedule_ids": outcome.future_schedule_ids,
        })),
        Err(e) => {
            error!(error = %e, schedule_id = %schedule_id, "flex resolution failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}
