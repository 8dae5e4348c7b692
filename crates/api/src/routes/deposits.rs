//! Deposit routes: import, listing, and lifecycle transitions.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use rivena_core::import::{ColumnMapping, DepositMetadata, ImportTable};
use rivena_core::lifecycle::DepositStatus;
use rivena_db::DepositRepository;
use rivena_shared::types::PageRequest;

use super::{data_response, error_response};
use crate::{middleware::AuthUser, AppState};

/// Creates the deposit routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deposits/import", post(import_deposit))
        .route("/deposits", get(list_deposits))
        .route("/deposits/{deposit_id}", get(get_deposit))
        .route("/deposits/{deposit_id}/finalize", post(finalize_deposit))
        .route("/deposits/{deposit_id}/unfinalize", post(unfinalize_deposit))
}

/// Request body for a deposit import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Tokenized upload.
    pub table: ImportTable,
    /// Column→field mapping.
    pub mapping: ColumnMapping,
    /// Deposit metadata.
    pub metadata: DepositMetadata,
}

/// Query parameters for the deposit list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Optional status filter.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

async fn import_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ImportRequest>,
) -> Response {
    let repo = DepositRepository::new(state.db.clone());
    match repo
        .import(
            user.tenant_id(),
            user.user_id(),
            &body.table,
            &body.mapping,
            &body.metadata,
        )
        .await
    {
        Ok(outcome) => data_response(json!({
            "deposit_id": outcome.deposit_id,
            "line_count": outcome.line_count,
            "skipped_rows": outcome.skipped_rows,
            "idempotent": outcome.idempotent,
        })),
        Err(e) => {
            error!(error = %e, "deposit import failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn list_deposits(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        Some(raw) => match DepositStatus::from_str(raw) {
            Ok(status) => Some(status.into()),
            Err(e) => return error_response(400, &e),
        },
        None => None,
    };

    let page = query.page_request();
    let repo = DepositRepository::new(state.db.clone());
    match repo.list(user.tenant_id(), status, &page).await {
        Ok((deposits, total)) => data_response(json!({
            "deposits": deposits,
            "total": total,
            "page": page.page,
            "per_page": page.per_page,
        })),
        Err(e) => {
            error!(error = %e, "deposit list failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn get_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(deposit_id): Path<Uuid>,
) -> Response {
    let repo = DepositRepository::new(state.db.clone());
    let deposit = match repo.get(user.tenant_id(), deposit_id).await {
        Ok(deposit) => deposit,
        Err(e) => return error_response(e.http_status_code(), &e.to_string()),
    };
    match repo.lines(user.tenant_id(), deposit_id).await {
        Ok(lines) => data_response(json!({ "deposit": deposit, "lines": lines })),
        Err(e) => error_response(e.http_status_code(), &e.to_string()),
    }
}

async fn finalize_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(deposit_id): Path<Uuid>,
) -> Response {
    let repo = DepositRepository::new(state.db.clone());
    match repo
        .finalize(user.tenant_id(), deposit_id, user.user_id())
        .await
    {
        Ok(deposit) => data_response(json!({ "deposit": deposit })),
        Err(e) => {
            error!(error = %e, deposit_id = %deposit_id, "finalize failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}

async fn unfinalize_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(deposit_id): Path<Uuid>,
) -> Response {
    let repo = DepositRepository::new(state.db.clone());
    match repo
        .unfinalize(user.tenant_id(), deposit_id, user.user_id())
        .await
    {
        Ok(deposit) => data_response(json!({ "deposit": deposit })),
        Err(e) => {
            error!(error = %e, deposit_id = %deposit_id, "unfinalize failed");
            error_response(e.http_status_code(), &e.to_string())
        }
    }
}
