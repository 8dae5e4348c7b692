//! API route definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{middleware, Json, Router};
use serde_json::json;

use crate::{middleware::auth::auth_middleware, AppState};

pub mod bundles;
pub mod deposits;
pub mod flex;
pub mod health;
pub mod line_items;

/// Creates the API router with all routes; everything except health checks
/// sits behind the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(deposits::routes())
        .merge(line_items::routes())
        .merge(flex::routes())
        .merge(bundles::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(health::routes()).merge(protected_routes)
}

/// Wraps a payload in the `{"data": ...}` success envelope.
pub(crate) fn data_response(payload: serde_json::Value) -> Response {
    (StatusCode::OK, Json(json!({ "data": payload }))).into_response()
}

/// Maps a repository/core error to its status code and JSON body.
pub(crate) fn error_response(status: u16, message: &str) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error = match status {
        400 => "validation_error",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not_found",
        409 => "conflict",
        _ => "internal_error",
    };
    (code, Json(json!({ "error": error, "message": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let response = error_response(409, "deposit already finalized");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = error_response(999, "bogus");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
