//! Bundle routes: rip-and-replace apply and undo.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use rivena_core::bundle::BundleMode;
use rivena_db::repositories::bundle::BundleApplyInput;
use rivena_db::BundleRepository;

use super::{data_response, error_response};
use crate::{middleware::AuthUser, AppState};

/// Creates the bundle routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bundles", post(apply_bundle))
        .route("/bundles/{bundle_audit_log_id}/undo", post(undo_bundle))
}

/// Request body for a bundle apply.
#[derive(Debug, Deserialize)]
pub struct BundleApplyRequest {
    /// Selected deposit lines.
    pub line_item_ids: Vec<Uuid>,
    /// Schedule whose product gets ripped and replaced.
    pub base_revenue_schedule_id: Uuid,
    /// What happens to the replaced schedules.
    pub mode: BundleMode,
    /// Operator-supplied reason.
    pub reason: String,
}

/// Request body for a bundle undo.
#[derive(Debug, Deserialize)]
pub struct BundleUndoRequest {
    /// Operator-supplied reason.
    pub reason: String,
}

async fn apply_bundle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<BundleApplyRequest>,
) -> Response {
    let input = BundleApplyInput {
        line_item_ids: body.line_item_ids,
        base_revenue_schedule_id: body.base_revenue_schedule_id,
        mode: body.mode,
        reason: body.reason,
    };

    let repo = BundleRepository::new(state.db.clone());
    match repo.apply(user.tenant_id(), user.user_id(), &input).await {
        Ok(outcome) => data_response(json!({
            "bundle_audit_log_id": outcome.bundle_audit_log_id,
            "created_product_id": outcome.created_product_id,
            "created_revenue_schedule_ids": outcome.created_revenue_schedule_ids,
            "line_to_schedule_map": outcome.line_to_schedule_map,
            "idempotent": outcome.idempotent,
        })),
        Err(e) => {
            error!(error = %e, "bundle apply failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn undo_bundle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bundle_audit_log_id): Path<Uuid>,
    Json(body): Json<BundleUndoRequest>,
) -> Response {
    let repo = BundleRepository::new(state.db.clone());
    match repo
        .undo(user.tenant_id(), bundle_audit_log_id, &body.reason)
        .await
    {
        Ok(outcome) => data_response(json!({
            "bundle_audit_log_id": outcome.bundle_audit_log_id,
            "removed_schedule_ids": outcome.removed_schedule_ids,
            "restored_schedule_ids": outcome.restored_schedule_ids,
        })),
        Err(e) => {
            error!(error = %e, bundle_audit_log_id = %bundle_audit_log_id, "bundle undo failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}
