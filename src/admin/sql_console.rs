//! A read-only SQL console for inspecting the database.

use axum::{
    Form, Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::{Connection, types::ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Error,
    admin::AdminState,
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE},
    validation::json_body,
};

/// Substrings that may not appear anywhere in a console query, compared case-insensitively.
const FORBIDDEN_KEYWORDS: [&str; 12] = [
    "delete", "update", "insert", "drop", "alter", "create", "truncate", "grant", "exec", "xp_",
    "--", "/*",
];

/// The columns and rows returned by a console query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// Check that `query` is a single SELECT statement without any blocked keywords.
///
/// # Errors
///
/// Returns:
/// - [Error::EmptyField] if the query is blank,
/// - [Error::NotASelectQuery] if the query does not start with SELECT,
/// - [Error::ForbiddenKeyword] with the first blocked keyword found.
pub fn check_query(query: &str) -> Result<(), Error> {
    let query = query.trim().to_lowercase();

    if query.is_empty() {
        return Err(Error::EmptyField("query"));
    }

    if !query.starts_with("select") {
        return Err(Error::NotASelectQuery);
    }

    match FORBIDDEN_KEYWORDS
        .iter()
        .find(|keyword| query.contains(*keyword))
    {
        Some(keyword) => Err(Error::ForbiddenKeyword((*keyword).to_owned())),
        None => Ok(()),
    }
}

fn to_json_value(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Value::from(real),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(format!("<{} bytes>", blob.len())),
    }
}

/// Run a checked SELECT query and collect every row.
///
/// # Errors
///
/// Returns the errors from [check_query], or [Error::InvalidQuery] if SQLite
/// rejects the query.
pub fn run_query(query: &str, connection: &Connection) -> Result<QueryResult, Error> {
    check_query(query)?;

    let invalid_query = |error: rusqlite::Error| Error::InvalidQuery(error.to_string());
    let mut statement = connection.prepare(query.trim()).map_err(invalid_query)?;

    if !statement.readonly() {
        return Err(Error::NotASelectQuery);
    }

    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let column_count = columns.len();

    let rows = statement
        .query_map([], |row| {
            (0..column_count)
                .map(|index| row.get_ref(index).map(to_json_value))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(invalid_query)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid_query)?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
    })
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SqlQueryRequest {
    pub query: String,
}

fn execute(state: &AdminState, query: &str) -> Result<QueryResult, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    tracing::info!("Running console query: {query}");
    run_query(query, &connection)
}

/// `POST /admin/api/sql`
pub async fn sql_query_endpoint(
    State(state): State<AdminState>,
    payload: Result<Json<SqlQueryRequest>, JsonRejection>,
) -> Response {
    let result = json_body(payload).and_then(|request| execute(&state, &request.query));

    match result {
        Ok(result) => Json(json!({
            "success": true,
            "columns": result.columns,
            "rows": result.rows,
            "row_count": result.row_count,
        }))
        .into_response(),
        Err(error) => error.into_json_response(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::String(text) => text.clone(),
        value => value.to_string(),
    }
}

pub(super) fn results_view(result: Option<&QueryResult>) -> Markup {
    html!(
        div id="sql-results" class="w-full overflow-x-auto"
        {
            @if let Some(result) = result {
                p class="text-sm mb-2" { "Rows: " (result.row_count) }

                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            @for column in &result.columns {
                                th scope="col" class=(TABLE_CELL_STYLE) { (column) }
                            }
                        }
                    }

                    tbody
                    {
                        @for row in &result.rows {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                @for value in row {
                                    td class=(TABLE_CELL_STYLE) { (display_value(value)) }
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

/// `POST /admin/forms/sql`: run the query and render the result table.
pub async fn sql_console_form_endpoint(
    State(state): State<AdminState>,
    Form(request): Form<SqlQueryRequest>,
) -> Response {
    match execute(&state, &request.query) {
        Ok(result) => results_view(Some(&result)).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod check_query_tests {
    use crate::Error;

    use super::check_query;

    #[test]
    fn accepts_select() {
        assert_eq!(check_query("  SeLeCt id FROM user"), Ok(()));
    }

    #[test]
    fn rejects_other_statements() {
        assert_eq!(check_query("PRAGMA table_info(user)"), Err(Error::NotASelectQuery));
        assert_eq!(check_query("   "), Err(Error::EmptyField("query")));
    }

    #[test]
    fn rejects_blocked_keywords_anywhere() {
        assert_eq!(
            check_query("select 1; DROP TABLE user"),
            Err(Error::ForbiddenKeyword("drop".to_owned()))
        );
        assert_eq!(
            check_query("select * from user -- comment"),
            Err(Error::ForbiddenKeyword("--".to_owned()))
        );
        assert_eq!(
            check_query("select created from goal"),
            Err(Error::ForbiddenKeyword("create".to_owned()))
        );
    }
}
