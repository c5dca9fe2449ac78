//! Exporting a user's data as a JSON document.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;
use time::{
    OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::{
    AppState, Error,
    account::{AccountId, get_accounts},
    auth::{UserID, get_user_by_id},
    budget_category::{BudgetCategoryId, get_budget_categories},
    goal::{GoalId, get_goals},
    timezone::get_local_offset,
    transaction::{TransactionId, get_transactions},
};

/// The state needed for exporting data.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Everything a user owns, in the format accepted by the import.
///
/// Amounts are written as strings with two decimal places.
#[derive(Debug, Serialize)]
pub struct UserDataExport {
    pub user: String,
    pub exported_at: String,
    pub accounts: Vec<AccountExport>,
    pub transactions: Vec<TransactionExport>,
    pub goals: Vec<GoalExport>,
    pub budget_categories: Vec<BudgetCategoryExport>,
}

#[derive(Debug, Serialize)]
pub struct AccountExport {
    pub id: AccountId,
    pub name: String,
    pub amount: String,
    pub account_type: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionExport {
    pub id: TransactionId,
    pub name: String,
    pub amount: String,
    pub transaction_type: String,
    pub category: String,
    pub date: String,
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Serialize)]
pub struct GoalExport {
    pub id: GoalId,
    pub name: String,
    pub target_amount: String,
    pub current_amount: String,
}

#[derive(Debug, Serialize)]
pub struct BudgetCategoryExport {
    pub id: BudgetCategoryId,
    pub name: String,
    pub budget: String,
    pub emoji: String,
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Collect the data of `user_id` for export.
///
/// # Errors
///
/// Returns an error if the user does not exist, a query fails or
/// `exported_at` cannot be formatted.
pub fn export_user_data(
    user_id: UserID,
    exported_at: OffsetDateTime,
    connection: &Connection,
) -> Result<UserDataExport, Error> {
    let user = get_user_by_id(user_id, connection)?;

    let accounts = get_accounts(user_id, connection)?
        .into_iter()
        .map(|account| AccountExport {
            id: account.id,
            name: account.name,
            amount: format_amount(account.amount),
            account_type: account.account_type.as_str().to_owned(),
            description: account.description,
        })
        .collect();

    let transactions = get_transactions(user_id, None, connection)?
        .into_iter()
        .map(|transaction| TransactionExport {
            id: transaction.id,
            name: transaction.name,
            amount: format_amount(transaction.amount),
            transaction_type: transaction.transaction_type.as_str().to_owned(),
            category: transaction.category.as_str().to_owned(),
            date: transaction.date.to_string(),
            account_id: transaction.account_id,
        })
        .collect();

    let goals = get_goals(user_id, connection)?
        .into_iter()
        .map(|goal| GoalExport {
            id: goal.id,
            name: goal.name,
            target_amount: format_amount(goal.target_amount),
            current_amount: format_amount(goal.current_amount),
        })
        .collect();

    let budget_categories = get_budget_categories(user_id, connection)?
        .into_iter()
        .map(|category| BudgetCategoryExport {
            id: category.id,
            name: category.name,
            budget: format_amount(category.budget),
            emoji: category.emoji,
        })
        .collect();

    Ok(UserDataExport {
        user: user.username.to_string(),
        exported_at: exported_at
            .format(&Rfc3339)
            .map_err(|error| Error::InvalidDateFormat(error.to_string()))?,
        accounts,
        transactions,
        goals,
        budget_categories,
    })
}

/// `GET /api/export`: download the user's data as a pretty printed JSON file.
pub async fn export_data_endpoint(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let offset = get_local_offset(&state.local_timezone).unwrap_or(UtcOffset::UTC);
    let now = OffsetDateTime::now_utc().to_offset(offset);

    let export = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_json_response();
            }
        };

        match export_user_data(user_id, now, &connection) {
            Ok(export) => export,
            Err(error) => return error.into_json_response(),
        }
    };

    let body = match serde_json::to_string_pretty(&export) {
        Ok(body) => body,
        Err(error) => {
            return Error::JSONSerializationError(error.to_string()).into_json_response();
        }
    };

    let timestamp = now
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_default();
    let disposition = format!(
        "attachment; filename=\"ctrlmoney_export_{}_{timestamp}.json\"",
        export.user
    );

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(error) => tracing::warn!("could not set the export file name {disposition}: {error}"),
    }

    response
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use serde_json::json;
    use time::macros::{date, datetime};

    use crate::{
        account::{AccountData, AccountType, create_account},
        budget_category::{BudgetCategoryData, save_budget_category},
        goal::{GoalData, save_goal},
        test_utils::{get_header, get_test_connection, must_create_user, must_get_json},
        transaction::{Category, Transaction, TransactionType, create_transaction},
    };

    use super::{ExportState, export_data_endpoint, export_user_data};

    #[test]
    fn exports_all_user_rows() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let other_user = must_create_user("olga", &connection);
        let account = create_account(
            user_id,
            &AccountData::new("Card", 1500.5, AccountType::Debit, "Salary card").unwrap(),
            &connection,
        )
        .unwrap();
        create_account(
            other_user,
            &AccountData::new("Olga's card", 1.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let transaction = create_transaction(
            user_id,
            &Transaction::build("Taxi", 350.0, TransactionType::Expense, date!(2025 - 04 - 01))
                .category(Category::Transport)
                .account_id(Some(account.id))
                .finalise()
                .unwrap(),
            &connection,
        )
        .unwrap();
        let goal = save_goal(
            user_id,
            None,
            &GoalData::new("Car", 100000.0, Some(500.0), false, vec![]).unwrap(),
            &connection,
        )
        .unwrap();
        let category = save_budget_category(
            user_id,
            &BudgetCategoryData::new("Transport", 3000.0, "🚌").unwrap(),
            &connection,
        )
        .unwrap();

        let export =
            export_user_data(user_id, datetime!(2025-04-02 10:30:00 +3), &connection).unwrap();

        assert_eq!(
            serde_json::to_value(&export).unwrap(),
            json!({
                "user": "ivan",
                "exported_at": "2025-04-02T10:30:00+03:00",
                "accounts": [{
                    "id": account.id,
                    "name": "Card",
                    "amount": "1500.50",
                    "account_type": "debit",
                    "description": "Salary card",
                }],
                "transactions": [{
                    "id": transaction.id,
                    "name": "Taxi",
                    "amount": "350.00",
                    "transaction_type": "expense",
                    "category": "transport",
                    "date": "2025-04-01",
                    "account_id": account.id,
                }],
                "goals": [{
                    "id": goal.id,
                    "name": "Car",
                    "target_amount": "100000.00",
                    "current_amount": "500.00",
                }],
                "budget_categories": [{
                    "id": category.id,
                    "name": "Transport",
                    "budget": "3000.00",
                    "emoji": "🚌",
                }],
            })
        );
    }

    #[tokio::test]
    async fn endpoint_returns_attachment() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = ExportState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = export_data_endpoint(State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = get_header(&response, "content-disposition");
        assert!(disposition.starts_with("attachment; filename=\"ctrlmoney_export_ivan_"));
        assert!(disposition.ends_with(".json\""));
        let body = must_get_json(response).await;
        assert_eq!(body["user"], "ivan");
        assert_eq!(body["accounts"], json!([]));
    }
}
