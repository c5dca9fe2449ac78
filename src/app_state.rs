//! The state shared by every request handler.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, auth::DEFAULT_COOKIE_DURATION, db::initialize};

/// Everything a handler may need: the cookie key, session settings, the
/// configured time zone and the single database connection.
///
/// Handlers take narrower state structs that implement `FromRef<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Encrypts and signs the private auth cookie.
    pub cookie_key: Key,

    /// How long a log-in lasts without activity.
    pub cookie_duration: Duration,

    /// Canonical time zone name used for dates and timestamps, e.g. "Europe/Moscow".
    pub local_timezone: String,

    /// The connection is shared by all requests, so every handler holds the lock
    /// for the whole of its read-modify-write.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create the tables in `db_connection` if needed and wrap it for sharing.
    ///
    /// # Errors
    /// Returns an error if the tables cannot be created.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let cookie_key = create_cookie_key(cookie_secret);
        let db_connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            cookie_key,
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Derive the 64 byte cookie key from an arbitrary length `secret`.
pub fn create_cookie_key(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret))
}
