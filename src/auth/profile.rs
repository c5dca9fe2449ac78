//! The user profile: the user's name and log-in lockout status.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{FullName, UserID},
};

/// Extra details stored for each user.
///
/// A profile is created together with its user and removed when the user is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserID,
    pub first_name: String,
    pub last_name: String,
    /// Empty if the user has no patronymic.
    pub patronymic: String,
    /// The number of consecutive failed log-in attempts.
    pub failed_log_in_attempts: u8,
    /// When the user was blocked, `None` if the user is not blocked.
    pub blocked_at: Option<OffsetDateTime>,
}

impl UserProfile {
    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }

    /// The name formatted as "last first patronymic", without the patronymic if it is empty.
    pub fn full_name(&self) -> String {
        [
            self.last_name.as_str(),
            self.first_name.as_str(),
            self.patronymic.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

pub fn create_profile_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_profile (
                user_id INTEGER PRIMARY KEY REFERENCES user(id) ON DELETE CASCADE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                patronymic TEXT NOT NULL DEFAULT '',
                is_blocked INTEGER NOT NULL DEFAULT 0,
                failed_login_attempts INTEGER NOT NULL DEFAULT 0
                    CHECK (failed_login_attempts BETWEEN 0 AND 3),
                blocked_at TEXT,
                CHECK ((is_blocked = 1) = (blocked_at IS NOT NULL))
                )",
        (),
    )?;

    Ok(())
}

/// Insert the profile for a newly created user.
///
/// Should only be called from [create_user](crate::auth::create_user) so that
/// every user has exactly one profile.
pub(super) fn insert_profile(
    user_id: UserID,
    name: Option<&FullName>,
    connection: &Connection,
) -> Result<(), Error> {
    let (first_name, last_name, patronymic) = match name {
        Some(name) => (
            name.first_name(),
            name.last_name(),
            name.patronymic().unwrap_or_default(),
        ),
        None => ("", "", ""),
    };

    connection.execute(
        "INSERT INTO user_profile (user_id, first_name, last_name, patronymic)
        VALUES (?1, ?2, ?3, ?4)",
        (user_id.as_i64(), first_name, last_name, patronymic),
    )?;

    Ok(())
}

pub(crate) fn map_profile_row(row: &Row) -> Result<UserProfile, rusqlite::Error> {
    let user_id = row.get(0)?;
    let first_name = row.get(1)?;
    let last_name = row.get(2)?;
    let patronymic = row.get(3)?;
    let failed_log_in_attempts = row.get(4)?;
    let blocked_at = row.get(5)?;

    Ok(UserProfile {
        user_id: UserID::new(user_id),
        first_name,
        last_name,
        patronymic,
        failed_log_in_attempts,
        blocked_at,
    })
}

/// Get the profile of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn get_profile(user_id: UserID, connection: &Connection) -> Result<UserProfile, Error> {
    connection
        .prepare(
            "SELECT user_id, first_name, last_name, patronymic, failed_login_attempts, blocked_at
            FROM user_profile WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_profile_row)
        .map_err(Error::from)
}

/// Replace the name stored in the profile of the user with `user_id`.
pub fn update_profile_names(
    user_id: UserID,
    name: &FullName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user_profile SET first_name = ?1, last_name = ?2, patronymic = ?3
        WHERE user_id = ?4",
        (
            name.first_name(),
            name.last_name(),
            name.patronymic().unwrap_or_default(),
            user_id.as_i64(),
        ),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}
