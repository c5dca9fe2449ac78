//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{FullName, PasswordHash, profile::insert_profile},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A name used to log in.
///
/// Usernames have 1 to 150 characters made up of letters, digits and `@.+-_`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// The maximum number of characters in a username.
    pub const MAX_LENGTH: usize = 150;

    /// Trim and validate a username.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidUsername] if the username is empty, too long or
    /// contains a character that is not allowed.
    pub fn new(raw_username: &str) -> Result<Self, Error> {
        let username = raw_username.trim();

        if username.is_empty() {
            return Err(Error::InvalidUsername(
                "username cannot be empty".to_owned(),
            ));
        }

        if username.chars().count() > Self::MAX_LENGTH {
            return Err(Error::InvalidUsername(format!(
                "username cannot be longer than {} characters",
                Self::MAX_LENGTH
            )));
        }

        let is_allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);

        if !username.chars().all(is_allowed) {
            return Err(Error::InvalidUsername(
                "username may only contain letters, digits and @.+-_".to_owned(),
            ));
        }

        Ok(Self(username.to_owned()))
    }

    /// Wrap a username that was loaded from the database.
    pub fn new_unchecked(raw_username: &str) -> Self {
        Self(raw_username.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: Username,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user may open the admin pages.
    pub is_staff: bool,
    /// Whether the user has every admin permission and cannot be blocked.
    pub is_superuser: bool,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                is_staff INTEGER NOT NULL DEFAULT 0,
                is_superuser INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Whether a new user is a regular user or an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Superuser,
}

/// Create a user together with their profile in one transaction.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateUsername] if the username is taken,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    username: Username,
    password_hash: PasswordHash,
    name: Option<&FullName>,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    let is_superuser = role == Role::Superuser;
    let transaction = connection.unchecked_transaction()?;

    transaction
        .execute(
            "INSERT INTO user (username, password, is_staff, is_superuser) VALUES (?1, ?2, ?3, ?4)",
            (
                username.as_ref(),
                password_hash.as_ref(),
                is_superuser,
                is_superuser,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 2067 => {
                Error::DuplicateUsername(username.to_string())
            }
            error => error.into(),
        })?;

    let id = UserID::new(transaction.last_insert_rowid());
    insert_profile(id, name, &transaction)?;
    transaction.commit()?;

    Ok(User {
        id,
        username,
        password_hash,
        is_staff: is_superuser,
        is_superuser,
    })
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_username: String = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;
    let is_staff = row.get(3)?;
    let is_superuser = row.get(4)?;

    Ok(User {
        id: UserID::new(id),
        username: Username::new_unchecked(&raw_username),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_staff,
        is_superuser,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, username, password, is_staff, is_superuser FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `username`.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if nobody registered the username.
pub fn get_user_by_username(username: &str, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(
            "SELECT id, username, password, is_staff, is_superuser FROM user
            WHERE username = :username",
        )?
        .query_row(&[(":username", &username.trim())], map_user_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UserNotFound,
            error => error.into(),
        })
}

/// Get every user ordered by username.
pub fn get_all_users(db_connection: &Connection) -> Result<Vec<User>, Error> {
    db_connection
        .prepare(
            "SELECT id, username, password, is_staff, is_superuser FROM user ORDER BY username",
        )?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))?;

    usize::try_from(count)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count).into())
}

/// Replace the password hash of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn set_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod username_tests {
    use crate::{Error, auth::Username};

    #[test]
    fn accepts_django_style_usernames() {
        for name in ["alice", "bob.smith+test@example.com", "иван_99", "a-b"] {
            assert!(Username::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(Username::new("  alice ").unwrap().as_ref(), "alice");
    }

    #[test]
    fn rejects_empty_long_and_bad_characters() {
        assert!(matches!(Username::new("   "), Err(Error::InvalidUsername(_))));
        assert!(matches!(
            Username::new(&"a".repeat(151)),
            Err(Error::InvalidUsername(_))
        ));
        assert!(matches!(
            Username::new("alice smith"),
            Err(Error::InvalidUsername(_))
        ));
        assert!(matches!(Username::new("alice!"), Err(Error::InvalidUsername(_))));
    }
}
