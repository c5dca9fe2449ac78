//! The JSON API for savings goals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error,
    account::AccountId,
    auth::UserID,
    goal::{
        core::{Goal, GoalData, GoalId, delete_goal, save_goal},
        progress::{GoalProgress, get_goals_with_progress},
    },
    validation::json_body,
};

/// The state needed by the goal API handlers.
#[derive(Debug, Clone)]
pub struct GoalApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A goal as returned by `GET /api/goals`.
#[derive(Debug, Serialize)]
struct GoalItem {
    id: GoalId,
    name: String,
    /// Same as `target_amount`, kept for older clients.
    target: f64,
    target_amount: f64,
    current_amount: f64,
    use_only_accounts: bool,
    accounts: Vec<AccountId>,
    calculated_amount: f64,
    progress_percent: u8,
}

impl GoalItem {
    fn new(goal: Goal, progress: GoalProgress) -> Self {
        Self {
            id: goal.id,
            name: goal.name,
            target: goal.target_amount,
            target_amount: goal.target_amount,
            current_amount: goal.current_amount,
            use_only_accounts: goal.use_only_linked_accounts,
            accounts: goal.linked_account_ids,
            calculated_amount: progress.calculated_amount,
            progress_percent: progress.progress_percent,
        }
    }
}

/// The request body for `POST /api/goals/save`.
///
/// Creates a goal when `id` is missing, otherwise updates the goal with that ID.
#[derive(Debug, Deserialize)]
pub struct SaveGoalRequest {
    #[serde(default)]
    pub id: Option<GoalId>,
    pub name: String,
    #[serde(default)]
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: Option<f64>,
    #[serde(default)]
    pub use_only_accounts: bool,
    #[serde(default)]
    pub accounts: Vec<AccountId>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteGoalRequest {
    pub id: GoalId,
}

/// `GET /api/goals`: list the user's goals with their progress.
pub async fn list_goals(
    State(state): State<GoalApiState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match get_goals_with_progress(user_id, &connection) {
        Ok(goals) => {
            let items: Vec<GoalItem> = goals
                .into_iter()
                .map(|(goal, progress)| GoalItem::new(goal, progress))
                .collect();

            Json(json!({ "success": true, "goals": items })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/goals/save`
pub async fn save_goal_endpoint(
    State(state): State<GoalApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SaveGoalRequest>, JsonRejection>,
) -> Response {
    let (goal_id, data) = match json_body(payload).and_then(|request| {
        let data = GoalData::new(
            &request.name,
            request.target_amount,
            request.current_amount,
            request.use_only_accounts,
            request.accounts,
        )?;
        Ok((request.id, data))
    }) {
        Ok(validated) => validated,
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match save_goal(user_id, goal_id, &data, &connection) {
        Ok(goal) => Json(json!({ "success": true, "id": goal.id })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/goals/delete` with `{"id": ...}`
pub async fn delete_goal_endpoint(
    State(state): State<GoalApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<DeleteGoalRequest>, JsonRejection>,
) -> Response {
    let goal_id = match json_body(payload) {
        Ok(request) => request.id,
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match delete_goal(user_id, goal_id, &connection) {
        Ok(()) => Json(json!({ "success": true, "message": "Goal deleted" })).into_response(),
        Err(error) => error.into_json_response(),
    }
}
