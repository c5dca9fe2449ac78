//! The admin panel for superusers: statistics, user management, backups and a read-only SQL console.

mod admin_page;
mod backup;
mod sql_console;
mod users;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

pub use admin_page::get_admin_page;
pub use backup::{full_backup_endpoint, user_backup_endpoint};
pub use sql_console::{sql_console_form_endpoint, sql_query_endpoint};
pub use users::{
    block_user_form_endpoint, block_users_endpoint, reset_attempts_endpoint,
    reset_attempts_form_endpoint, unblock_user_form_endpoint, unblock_users_endpoint,
};

/// The state shared by the admin pages and endpoints.
#[derive(Debug, Clone)]
pub struct AdminState {
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}
