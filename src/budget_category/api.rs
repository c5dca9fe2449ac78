//! The JSON API for budget categories.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    auth::UserID,
    budget_category::core::{
        BudgetCategoryData, BudgetCategoryId, delete_budget_category, get_budget_categories,
        save_budget_category,
    },
    validation::json_body,
};

#[derive(Debug, Clone)]
pub struct BudgetCategoryApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetCategoryApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub emoji: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryRequest {
    pub id: BudgetCategoryId,
}

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<BudgetCategoryApiState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match get_budget_categories(user_id, &connection) {
        Ok(categories) => {
            Json(json!({ "success": true, "categories": categories })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/categories/save`: create the named category or update its budget and emoji.
pub async fn save_category_endpoint(
    State(state): State<BudgetCategoryApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SaveCategoryRequest>, JsonRejection>,
) -> Response {
    let data = match json_body(payload).and_then(|request| {
        BudgetCategoryData::new(&request.name, request.budget, &request.emoji)
    }) {
        Ok(data) => data,
        Err(error) => return error.into_json_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match save_budget_category(user_id, &data, &connection) {
        Ok(category) => Json(json!({ "success": true, "category": category })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/categories/delete`
pub async fn delete_category_endpoint(
    State(state): State<BudgetCategoryApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<DeleteCategoryRequest>, JsonRejection>,
) -> Response {
    let category_id = match json_body(payload) {
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

    match delete_budget_category(user_id, category_id, &connection) {
        Ok(()) => {
            Json(json!({ "success": true, "message": "Category deleted" })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
