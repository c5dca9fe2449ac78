//! The JSON API for transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    account::AccountId,
    auth::UserID,
    timezone::local_today,
    transaction::core::{
        Category, Transaction, TransactionData, TransactionId, create_transaction,
        delete_transaction, get_transactions, update_transaction,
    },
    validation::{json_body, parse_date},
};

/// The state needed by the transaction API handlers.
#[derive(Debug, Clone)]
pub struct TransactionApiState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// Used to pick today's date when a request has no date.
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The request body for creating or updating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    pub transaction_type: String,
    #[serde(default)]
    pub category: Option<String>,
    /// `YYYY-MM-DD`, defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl TransactionRequest {
    fn validate(&self, today: Date) -> Result<TransactionData, Error> {
        let category = match &self.category {
            Some(category) => category.parse()?,
            None => Category::default(),
        };
        let date = match &self.date {
            Some(date) => parse_date(date)?,
            None => today,
        };

        Transaction::build(&self.name, self.amount, self.transaction_type.parse()?, date)
            .category(category)
            .account_id(self.account_id)
            .finalise()
    }
}

/// `GET /api/transactions`: list the user's transactions, newest date first.
pub async fn list_transactions(
    State(state): State<TransactionApiState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match get_transactions(user_id, None, &connection) {
        Ok(transactions) => {
            Json(json!({ "success": true, "transactions": transactions })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/transactions`
pub async fn create_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Response {
    let today = local_today(&state.local_timezone);
    let data = match json_body(payload).and_then(|request| request.validate(today)) {
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

    match create_transaction(user_id, &data, &connection) {
        Ok(transaction) => {
            Json(json!({ "success": true, "transaction": transaction })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// `PUT /api/transactions/{transaction_id}`
pub async fn update_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Response {
    let today = local_today(&state.local_timezone);
    let data = match json_body(payload).and_then(|request| request.validate(today)) {
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

    match update_transaction(user_id, transaction_id, &data, &connection) {
        Ok(transaction) => {
            Json(json!({ "success": true, "transaction": transaction })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}

/// `DELETE /api/transactions/{transaction_id}`
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionApiState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match delete_transaction(user_id, transaction_id, &connection) {
        Ok(()) => {
            Json(json!({ "success": true, "message": "Transaction deleted" })).into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
