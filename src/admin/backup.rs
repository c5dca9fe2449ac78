//! SQL dumps of the whole database or of a single user's rows.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, types::ValueRef};
use time::{
    OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::{
    Error,
    admin::AdminState,
    auth::{User, UserID, get_user_by_id},
    timezone::get_local_offset,
};

/// Every table in dependency order, with the condition that selects one user's rows.
const TABLES: [(&str, &str); 7] = [
    ("user", "id = ?1"),
    ("user_profile", "user_id = ?1"),
    ("account", "user_id = ?1"),
    ("transaction", "user_id = ?1"),
    ("goal", "user_id = ?1"),
    (
        "goal_account",
        "goal_id IN (SELECT id FROM goal WHERE user_id = ?1)",
    ),
    ("budget_category", "user_id = ?1"),
];

fn sql_literal(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_owned(),
        ValueRef::Integer(integer) => integer.to_string(),
        ValueRef::Real(real) => real.to_string(),
        ValueRef::Text(text) => format!("'{}'", String::from_utf8_lossy(text).replace('\'', "''")),
        ValueRef::Blob(blob) => {
            let hex: String = blob.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

/// Append a section with one INSERT statement per row of `table`.
fn dump_table(
    table: &str,
    user_filter: Option<(&str, UserID)>,
    connection: &Connection,
    output: &mut String,
) -> Result<(), Error> {
    let query = match user_filter {
        Some((condition, _)) => {
            format!("SELECT * FROM \"{table}\" WHERE {condition} ORDER BY rowid")
        }
        None => format!("SELECT * FROM \"{table}\" ORDER BY rowid"),
    };
    let mut statement = connection.prepare(&query)?;
    let columns = statement.column_names().join(", ");
    let column_count = statement.column_count();

    let mut rows = match user_filter {
        Some((_, user_id)) => statement.query([user_id.as_i64()])?,
        None => statement.query([])?,
    };

    output.push_str(&format!(
        "\n-- ===== {} TABLE =====\n",
        table.to_uppercase()
    ));

    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|index| row.get_ref(index).map(sql_literal))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        output.push_str(&format!(
            "INSERT INTO \"{table}\" ({columns}) VALUES ({values});\n"
        ));
    }

    Ok(())
}

fn format_generated_at(generated_at: OffsetDateTime) -> Result<String, Error> {
    generated_at
        .format(&Rfc3339)
        .map_err(|error| Error::InvalidDateFormat(error.to_string()))
}

/// Dump every row of every table as SQL INSERT statements wrapped in a transaction.
///
/// # Errors
///
/// Returns an [Error::SqlError] if a table could not be read.
pub fn generate_full_backup(
    generated_at: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let mut output = format!(
        "-- CtrlMoney Database Backup\n-- Generated: {}\nBEGIN TRANSACTION;\n",
        format_generated_at(generated_at)?
    );

    for (table, _) in TABLES {
        dump_table(table, None, connection, &mut output)?;
    }

    output.push_str("\nCOMMIT;\n");

    Ok(output)
}

/// Dump the rows that belong to `user`, including the user row itself.
///
/// # Errors
///
/// Returns an [Error::SqlError] if a table could not be read.
pub fn generate_user_backup(
    user: &User,
    generated_at: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let mut output = format!(
        "-- CtrlMoney Database Backup - User Specific\n-- User: {}\n-- Generated: {}\n\
        BEGIN TRANSACTION;\n",
        user.username,
        format_generated_at(generated_at)?
    );

    for (table, condition) in TABLES {
        dump_table(table, Some((condition, user.id)), connection, &mut output)?;
    }

    output.push_str("\nCOMMIT;\n");

    Ok(output)
}

fn file_timestamp(now: OffsetDateTime) -> String {
    now.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))
    .unwrap_or_default()
}

fn sql_attachment(body: String, file_name: &str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    let disposition = format!("attachment; filename=\"{file_name}\"");
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(error) => tracing::warn!("could not set the backup file name {file_name}: {error}"),
    }

    response
}

fn local_now(local_timezone: &str) -> OffsetDateTime {
    let offset = get_local_offset(local_timezone).unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset)
}

/// `GET /admin/backup`
pub async fn full_backup_endpoint(State(state): State<AdminState>) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone);

    let backup = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        generate_full_backup(now, &connection)?
    };

    tracing::info!("Generated a full database backup");
    let file_name = format!("ctrlmoney_backup_full_{}.sql", file_timestamp(now));

    Ok(sql_attachment(backup, &file_name))
}

/// `GET /admin/backup/{user_id}`
pub async fn user_backup_endpoint(
    State(state): State<AdminState>,
    Path(user_id): Path<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone);

    let (user, backup) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let user = get_user_by_id(user_id, &connection)?;
        let backup = generate_user_backup(&user, now, &connection)?;
        (user, backup)
    };

    tracing::info!("Generated a backup of user {}", user.username);
    let file_name = format!(
        "ctrlmoney_backup_{}_{}.sql",
        user.username,
        file_timestamp(now)
    );

    Ok(sql_attachment(backup, &file_name))
}
