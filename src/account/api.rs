//! The JSON API for accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    account::core::{
        AccountData, AccountId, AccountType, create_account, delete_account, get_accounts,
        update_account,
    },
    auth::UserID,
    validation::json_body,
};

/// The state needed by the account API handlers.
#[derive(Debug, Clone)]
pub struct AccountApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or updating an account.
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    /// Kept as text so that unknown types produce a readable error.
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl AccountRequest {
    fn validate(&self) -> Result<AccountData, Error> {
        let account_type = match &self.account_type {
            Some(account_type) => account_type.parse()?,
            None => AccountType::default(),
        };

        AccountData::new(&self.name, self.amount, account_type, &self.description)
    }
}

/// `GET /api/accounts`: list the user's accounts, newest first.
pub async fn list_accounts(
    State(state): State<AccountApiState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match get_accounts(user_id, &connection) {
        Ok(accounts) => Json(json!({ "success": true, "accounts": accounts })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `POST /api/accounts`
pub async fn create_account_endpoint(
    State(state): State<AccountApiState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<AccountRequest>, JsonRejection>,
) -> Response {
    let data = match json_body(payload).and_then(|request| request.validate()) {
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

    match create_account(user_id, &data, &connection) {
        Ok(account) => Json(json!({ "success": true, "account": account })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `PUT /api/accounts/{account_id}`
pub async fn update_account_endpoint(
    State(state): State<AccountApiState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
    payload: Result<Json<AccountRequest>, JsonRejection>,
) -> Response {
    let data = match json_body(payload).and_then(|request| request.validate()) {
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

    match update_account(user_id, account_id, &data, &connection) {
        Ok(account) => Json(json!({ "success": true, "account": account })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// `DELETE /api/accounts/{account_id}`
pub async fn delete_account_endpoint(
    State(state): State<AccountApiState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_json_response();
        }
    };

    match delete_account(user_id, account_id, &connection) {
        Ok(()) => Json(json!({ "success": true, "message": "Account deleted" })).into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use serde_json::json;

    use crate::{
        account::core::{AccountData, AccountType, create_account},
        test_utils::{get_test_connection, must_create_user, must_get_json},
    };

    use super::{
        AccountApiState, AccountRequest, create_account_endpoint, delete_account_endpoint,
        list_accounts, update_account_endpoint,
    };

    fn request(name: &str, amount: f64, account_type: Option<&str>) -> AccountRequest {
        AccountRequest {
            name: name.to_owned(),
            amount,
            account_type: account_type.map(str::to_owned),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn lists_accounts() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(
            user_id,
            &AccountData::new("Card", 1200.5, AccountType::Debit, "salary").unwrap(),
            &connection,
        )
        .unwrap();
        let state = AccountApiState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = list_accounts(State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            must_get_json(response).await,
            json!({
                "success": true,
                "accounts": [{
                    "id": account.id,
                    "name": "Card",
                    "amount": 1200.5,
                    "account_type": "debit",
                    "description": "salary",
                }]
            })
        );
    }

    #[tokio::test]
    async fn create_defaults_to_other_type() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = AccountApiState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = create_account_endpoint(
            State(state),
            Extension(user_id),
            Ok(Json(request("Wallet", 10.0, None))),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = must_get_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["account"]["account_type"], "other");
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = AccountApiState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = create_account_endpoint(
            State(state.clone()),
            Extension(user_id),
            Ok(Json(request("Wallet", -5.0, None))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            must_get_json(response).await,
            json!({ "success": false, "error": "Amount cannot be negative" })
        );

        let response = create_account_endpoint(
            State(state),
            Extension(user_id),
            Ok(Json(request("Wallet", 5.0, Some("wallet")))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            must_get_json(response).await["error"],
            "Unknown account type \"wallet\""
        );
    }

    #[tokio::test]
    async fn update_and_delete_other_users_account_is_not_found() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let account = create_account(
            ivan,
            &AccountData::new("Card", 1.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let state = AccountApiState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = update_account_endpoint(
            State(state.clone()),
            Extension(olga),
            Path(account.id),
            Ok(Json(request("Mine", 1.0, Some("cash")))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            delete_account_endpoint(State(state.clone()), Extension(olga), Path(account.id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            delete_account_endpoint(State(state), Extension(ivan), Path(account.id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(must_get_json(response).await["success"], true);
    }
}
