//! Blocking, unblocking and resetting the failed log-in attempts of users.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    Error,
    admin::AdminState,
    alert::Alert,
    auth::{UserID, block_users, reset_log_in_attempts, unblock_users},
    endpoints,
    validation::json_body,
};

/// The request body shared by the bulk user actions.
#[derive(Debug, Deserialize)]
pub struct UserIdsRequest {
    pub user_ids: Vec<i64>,
}

impl UserIdsRequest {
    fn ids(&self) -> Vec<UserID> {
        self.user_ids.iter().copied().map(UserID::new).collect()
    }
}

/// `POST /admin/api/users/block`
pub async fn block_users_endpoint(
    State(state): State<AdminState>,
    payload: Result<Json<UserIdsRequest>, JsonRejection>,
) -> Response {
    let user_ids = match json_body(payload) {
        Ok(request) => request.ids(),
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match block_users(&user_ids, OffsetDateTime::now_utc(), &connection) {
        Ok(summary) => Json(json!({
            "success": true,
            "blocked": summary.blocked,
            "skipped_superusers": summary.skipped_superusers,
            "message": format!(
                "Blocked {} users, skipped {} superusers",
                summary.blocked, summary.skipped_superusers
            ),
        }))
        .into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `POST /admin/api/users/unblock`
pub async fn unblock_users_endpoint(
    State(state): State<AdminState>,
    payload: Result<Json<UserIdsRequest>, JsonRejection>,
) -> Response {
    let user_ids = match json_body(payload) {
        Ok(request) => request.ids(),
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match unblock_users(&user_ids, &connection) {
        Ok(count) => Json(json!({
            "success": true,
            "unblocked": count,
            "message": format!("Unblocked {count} users"),
        }))
        .into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `POST /admin/api/users/reset_attempts`
pub async fn reset_attempts_endpoint(
    State(state): State<AdminState>,
    payload: Result<Json<UserIdsRequest>, JsonRejection>,
) -> Response {
    let user_ids = match json_body(payload) {
        Ok(request) => request.ids(),
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match reset_log_in_attempts(&user_ids, &connection) {
        Ok(count) => Json(json!({
            "success": true,
            "reset": count,
            "message": format!("Reset the log-in attempts of {count} users"),
        }))
        .into_response(),
        Err(error) => error.into_json_response(),
    }
}

fn refresh_admin_page() -> Response {
    (
        HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// `POST /admin/forms/users/{user_id}/block`: the block button on the admin page.
pub async fn block_user_form_endpoint(
    State(state): State<AdminState>,
    Path(user_id): Path<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match block_users(&[user_id], OffsetDateTime::now_utc(), &connection) {
        Ok(summary) if summary.skipped_superusers > 0 => (
            StatusCode::BAD_REQUEST,
            Alert::ErrorSimple {
                message: "Superusers cannot be blocked".to_owned(),
            }
            .into_html(),
        )
            .into_response(),
        Ok(_) => refresh_admin_page(),
        Err(error) => error.into_alert_response(),
    }
}

/// `POST /admin/forms/users/{user_id}/unblock`
pub async fn unblock_user_form_endpoint(
    State(state): State<AdminState>,
    Path(user_id): Path<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match unblock_users(&[user_id], &connection) {
        Ok(0) => Error::NotFound.into_alert_response(),
        Ok(_) => refresh_admin_page(),
        Err(error) => error.into_alert_response(),
    }
}

/// `POST /admin/forms/users/{user_id}/reset_attempts`
pub async fn reset_attempts_form_endpoint(
    State(state): State<AdminState>,
    Path(user_id): Path<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match reset_log_in_attempts(&[user_id], &connection) {
        Ok(0) => Error::NotFound.into_alert_response(),
        Ok(_) => refresh_admin_page(),
        Err(error) => error.into_alert_response(),
    }
}
