//! Sets up the application database.

use rusqlite::Connection;

use crate::{
    Error,
    account::create_account_table,
    auth::{create_profile_table, create_user_table},
    budget_category::create_budget_category_table,
    goal::create_goal_tables,
    transaction::create_transaction_table,
};

/// Create all the tables for the application and enable foreign key checks.
///
/// Existing tables are left untouched, so this is safe to call on every start-up.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_profile_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_goal_tables(&transaction)?;
    create_budget_category_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
