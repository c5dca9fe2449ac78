//! Importing accounts, transactions, goals and budgets from a JSON document.
//!
//! Rows are imported one at a time. A row that fails validation is skipped and
//! reported as `"Row N: <reason>"` without stopping the rest of the import.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{FromRef, Multipart, State, multipart::MultipartRejection},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRequest;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::Date;

use crate::{
    AppState, Error,
    account::{AccountData, AccountId, create_account, get_accounts},
    alert::Alert,
    auth::UserID,
    budget_category::{BudgetCategoryData, create_budget_category},
    goal::{GoalData, save_goal},
    timezone::local_today,
    transaction::{Category, Transaction, TransactionType, create_transaction},
    validation::parse_date,
};

/// The multipart field holding the uploaded file.
pub const JSON_FILE_FIELD: &str = "json_file";

/// The top level keys an import document may have.
pub const IMPORT_SECTIONS: [&str; 4] = ["accounts", "transactions", "goals", "budget_categories"];

#[derive(Debug, Clone)]
pub struct ImportState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The outcome of importing one section of the document.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SectionResult {
    pub created: usize,
    pub errors: Vec<String>,
}

impl SectionResult {
    fn record(&mut self, row_index: usize, outcome: Result<(), Error>) {
        match outcome {
            Ok(()) => self.created += 1,
            Err(error) => self.errors.push(format!("Row {}: {error}", row_index + 1)),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportResults {
    pub accounts: SectionResult,
    pub transactions: SectionResult,
    pub goals: SectionResult,
    pub budget_categories: SectionResult,
}

impl ImportResults {
    fn error_count(&self) -> usize {
        self.accounts.errors.len()
            + self.transactions.errors.len()
            + self.goals.errors.len()
            + self.budget_categories.errors.len()
    }

    fn summary(&self) -> String {
        format!(
            "Created {} accounts, {} transactions, {} goals and {} budgets. {} rows were skipped.",
            self.accounts.created,
            self.transactions.created,
            self.goals.created,
            self.budget_categories.created,
            self.error_count()
        )
    }
}

/// Parse `bytes` as JSON and check it is an object with only known keys whose values are arrays.
///
/// # Errors
///
/// Returns [Error::InvalidImport] describing every structural problem found.
pub fn parse_import_document(bytes: &[u8]) -> Result<Map<String, Value>, Error> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|error| Error::InvalidImport(format!("could not parse JSON: {error}")))?;

    let Value::Object(document) = document else {
        return Err(Error::InvalidImport("the document must be a JSON object".to_owned()));
    };

    let mut unknown_keys: Vec<&str> = document
        .keys()
        .map(String::as_str)
        .filter(|key| !IMPORT_SECTIONS.contains(key))
        .collect();
    if !unknown_keys.is_empty() {
        unknown_keys.sort_unstable();
        return Err(Error::InvalidImport(format!(
            "unknown keys: {}",
            unknown_keys.join(", ")
        )));
    }

    let errors: Vec<String> = IMPORT_SECTIONS
        .iter()
        .filter(|section| document.get(**section).is_some_and(|value| !value.is_array()))
        .map(|section| format!("\"{section}\" must be an array"))
        .collect();
    if !errors.is_empty() {
        return Err(Error::InvalidImport(errors.join("; ")));
    }

    Ok(document)
}

fn section<'a>(document: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn as_row(row: &Value) -> Result<&Map<String, Value>, Error> {
    row.as_object().ok_or_else(|| Error::WrongFieldType {
        field: "row".to_owned(),
        expected: "an object",
    })
}

fn text_field<'a>(row: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, Error> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(Error::WrongFieldType {
            field: key.to_owned(),
            expected: "a string",
        }),
    }
}

/// Read an amount written either as a number or as a decimal string.
fn amount_field(row: &Map<String, Value>, key: &str) -> Result<f64, Error> {
    let wrong_type = || Error::WrongFieldType {
        field: key.to_owned(),
        expected: "a number",
    };

    match row.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(number)) => number.as_f64().ok_or_else(wrong_type),
        Some(Value::String(text)) => text.trim().parse().map_err(|_| wrong_type()),
        Some(_) => Err(wrong_type()),
    }
}

fn import_account(row: &Value, row_index: usize, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let row = as_row(row)?;
    let default_name = format!("Account {}", row_index + 1);
    let account_type = match text_field(row, "account_type")? {
        Some(account_type) => account_type.parse()?,
        None => Default::default(),
    };

    let data = AccountData::new(
        text_field(row, "name")?.unwrap_or(&default_name),
        amount_field(row, "amount")?,
        account_type,
        text_field(row, "description")?.unwrap_or_default(),
    )?;
    create_account(user_id, &data, connection)?;

    Ok(())
}

fn import_transaction(
    row: &Value,
    row_index: usize,
    user_id: UserID,
    owned_accounts: &HashSet<AccountId>,
    today: Date,
    connection: &Connection,
) -> Result<(), Error> {
    let row = as_row(row)?;
    let default_name = format!("Transaction {}", row_index + 1);
    let transaction_type: TransactionType = text_field(row, "transaction_type")?
        .unwrap_or("expense")
        .parse()?;
    let category: Category = match text_field(row, "category")? {
        Some(category) => category.parse()?,
        None => Category::default(),
    };
    // Full ISO date times are cut down to their date. Unreadable dates fall back to today.
    let date = text_field(row, "date")?
        .and_then(|raw| raw.get(..10))
        .and_then(|raw| parse_date(raw).ok())
        .unwrap_or(today);
    // Account IDs from another database or user are dropped.
    let account_id = row
        .get("account_id")
        .and_then(Value::as_i64)
        .filter(|account_id| owned_accounts.contains(account_id));

    let data = Transaction::build(
        text_field(row, "name")?.unwrap_or(&default_name),
        amount_field(row, "amount")?,
        transaction_type,
        date,
    )
    .category(category)
    .account_id(account_id)
    .finalise()?;
    create_transaction(user_id, &data, connection)?;

    Ok(())
}

fn import_goal(row: &Value, row_index: usize, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let row = as_row(row)?;
    let default_name = format!("Goal {}", row_index + 1);

    let data = GoalData::new(
        text_field(row, "name")?.unwrap_or(&default_name),
        amount_field(row, "target_amount")?,
        Some(amount_field(row, "current_amount")?),
        false,
        Vec::new(),
    )?;
    save_goal(user_id, None, &data, connection)?;

    Ok(())
}

fn import_budget_category(
    row: &Value,
    row_index: usize,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let row = as_row(row)?;
    let default_name = format!("Category {}", row_index + 1);

    let data = BudgetCategoryData::new(
        text_field(row, "name")?.unwrap_or(&default_name),
        amount_field(row, "budget")?,
        text_field(row, "emoji")?.unwrap_or_default(),
    )?;
    create_budget_category(user_id, &data, connection)?;

    Ok(())
}

/// Import the rows of `document` for `user_id`.
///
/// Transactions without a date are dated `today`.
///
/// # Errors
///
/// Row errors are collected in the results. An error is only returned if the
/// user's accounts cannot be listed.
pub fn import_user_data(
    user_id: UserID,
    document: &Map<String, Value>,
    today: Date,
    connection: &Connection,
) -> Result<ImportResults, Error> {
    let mut results = ImportResults::default();

    for (index, row) in section(document, "accounts").iter().enumerate() {
        results
            .accounts
            .record(index, import_account(row, index, user_id, connection));
    }

    // Fetched after the accounts section so that imported accounts can be referenced.
    let owned_accounts: HashSet<AccountId> = get_accounts(user_id, connection)?
        .into_iter()
        .map(|account| account.id)
        .collect();

    for (index, row) in section(document, "transactions").iter().enumerate() {
        results.transactions.record(
            index,
            import_transaction(row, index, user_id, &owned_accounts, today, connection),
        );
    }

    for (index, row) in section(document, "goals").iter().enumerate() {
        results
            .goals
            .record(index, import_goal(row, index, user_id, connection));
    }

    for (index, row) in section(document, "budget_categories").iter().enumerate() {
        results.budget_categories.record(
            index,
            import_budget_category(row, index, user_id, connection),
        );
    }

    Ok(results)
}

async fn read_json_file(multipart: Result<Multipart, MultipartRejection>) -> Result<Bytes, Error> {
    let mut multipart =
        multipart.map_err(|rejection| Error::MultipartError(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        if field.name() == Some(JSON_FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|error| Error::MultipartError(error.body_text()));
        }
    }

    Err(Error::InvalidImport(format!(
        "no file was uploaded in the \"{JSON_FILE_FIELD}\" field"
    )))
}

/// `POST /api/import`: import a JSON file uploaded as multipart form data.
///
/// Responds with `{"success": true, "results": ...}`, or with an alert when
/// the upload comes from the HTMX form on the profile page.
pub async fn import_data_endpoint(
    State(state): State<ImportState>,
    Extension(user_id): Extension<UserID>,
    HxRequest(is_htmx): HxRequest,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let into_error_response = |error: Error| {
        if is_htmx {
            error.into_alert_response()
        } else {
            error.into_json_response()
        }
    };

    let document = match read_json_file(multipart)
        .await
        .and_then(|bytes| parse_import_document(&bytes))
    {
        Ok(document) => document,
        Err(error) => return into_error_response(error),
    };

    let today = local_today(&state.local_timezone);
    let results = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return into_error_response(Error::DatabaseLockError);
            }
        };

        match import_user_data(user_id, &document, today, &connection) {
            Ok(results) => results,
            Err(error) => return into_error_response(error),
        }
    };

    tracing::info!("user {user_id} imported data: {}", results.summary());

    if is_htmx {
        let mut details = results.summary();
        for error in results
            .accounts
            .errors
            .iter()
            .chain(&results.transactions.errors)
            .chain(&results.goals.errors)
            .chain(&results.budget_categories.errors)
        {
            details.push(' ');
            details.push_str(error);
            details.push('.');
        }

        Alert::Success {
            message: "Import finished".to_owned(),
            details,
        }
        .into_response()
    } else {
        Json(json!({ "success": true, "results": results })).into_response()
    }
}

#[cfg(test)]
mod parse_tests {
    use crate::Error;

    use super::parse_import_document;

    #[test]
    fn accepts_known_sections() {
        let document =
            parse_import_document(br#"{"accounts": [], "budget_categories": []}"#).unwrap();

        assert_eq!(document.len(), 2);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_import_document(b"{\"accounts\": ["),
            Err(Error::InvalidImport(message)) if message.starts_with("could not parse JSON")
        ));
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(
            parse_import_document(b"[]"),
            Err(Error::InvalidImport(
                "the document must be a JSON object".to_owned()
            ))
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert_eq!(
            parse_import_document(br#"{"users": [], "accounts": [], "tags": []}"#),
            Err(Error::InvalidImport("unknown keys: tags, users".to_owned()))
        );
    }

    #[test]
    fn rejects_sections_that_are_not_arrays() {
        assert_eq!(
            parse_import_document(br#"{"accounts": {}, "goals": 1}"#),
            Err(Error::InvalidImport(
                "\"accounts\" must be an array; \"goals\" must be an array".to_owned()
            ))
        );
    }
}
