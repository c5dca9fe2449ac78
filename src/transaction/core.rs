//! Defines the core data models and database queries for transactions.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::{AccountId, check_account_owner},
    auth::UserID,
    validation::{positive_amount, required_text},
};

pub type TransactionId = i64;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Income, TransactionType::Expense];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|transaction_type| transaction_type.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidTransactionType(s.to_owned()))
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// What the money was earned or spent on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Housing,
    Health,
    Clothing,
    Income,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Housing,
        Category::Health,
        Category::Clothing,
        Category::Income,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Entertainment => "entertainment",
            Category::Housing => "housing",
            Category::Health => "health",
            Category::Clothing => "clothing",
            Category::Income => "income",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Housing => "Housing",
            Category::Health => "Health",
            Category::Clothing => "Clothing",
            Category::Income => "Income",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Food => "🍔",
            Category::Transport => "🚌",
            Category::Entertainment => "🎮",
            Category::Housing => "🏠",
            Category::Health => "💊",
            Category::Clothing => "👕",
            Category::Income => "💰",
            Category::Other => "💡",
        }
    }

    /// Find the category a budget category name refers to, ignoring case.
    ///
    /// Both the stored value ("food") and the label ("Food") match.
    pub fn from_budget_name(name: &str) -> Option<Category> {
        let name = name.trim();

        Category::ALL.into_iter().find(|category| {
            category.as_str().eq_ignore_ascii_case(name) || category.label().eq_ignore_ascii_case(name)
        })
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidCategory(s.to_owned()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub name: String,
    /// Always greater than zero, [Transaction::transaction_type] gives the direction.
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: Category,
    #[serde(with = "iso_date")]
    pub date: Date,
    /// The account the money moved through, `None` if it was not set or the
    /// account was deleted.
    pub account_id: Option<AccountId>,
    /// The name of the account, for display.
    pub account: Option<String>,
}

impl Transaction {
    /// Start building the fields for a new or updated transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        name: &str,
        amount: f64,
        transaction_type: TransactionType,
        date: Date,
    ) -> TransactionBuilder {
        TransactionBuilder {
            name: name.to_owned(),
            amount,
            transaction_type,
            category: Category::default(),
            date,
            account_id: None,
        }
    }
}

/// A builder for the fields of a transaction.
///
/// Call [TransactionBuilder::finalise] to validate the fields before passing
/// them to [create_transaction] or [update_transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    pub name: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: Category,
    pub date: Date,
    pub account_id: Option<AccountId>,
}

impl TransactionBuilder {
    pub const MAX_NAME_LENGTH: usize = 200;

    /// Set the category, defaults to [Category::Other].
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the account the money moved through.
    pub fn account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Check the name and amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or longer than
    /// [TransactionBuilder::MAX_NAME_LENGTH] characters, or if the amount is
    /// not greater than zero.
    pub fn finalise(self) -> Result<TransactionData, Error> {
        Ok(TransactionData {
            name: required_text("name", &self.name, Self::MAX_NAME_LENGTH)?,
            amount: positive_amount("amount", self.amount)?,
            transaction_type: self.transaction_type,
            category: self.category,
            date: self.date,
            account_id: self.account_id,
        })
    }
}

/// Validated transaction fields, see [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionData {
    name: String,
    amount: f64,
    transaction_type: TransactionType,
    category: Category,
    date: Date,
    account_id: Option<AccountId>,
}

/// The sums of a user's income and expenses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionTotals {
    pub income: f64,
    pub expense: f64,
}

impl TransactionTotals {
    /// Income minus expenses.
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            account_id INTEGER REFERENCES account(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            transaction_type TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'other',
            date TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date)",
        (),
    )?;

    Ok(())
}

const SELECT_TRANSACTION: &str = "SELECT t.id, t.name, t.amount, t.transaction_type, t.category, \
    t.date, t.account_id, a.name
    FROM \"transaction\" t LEFT JOIN account a ON a.id = t.account_id";

pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        transaction_type: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        account_id: row.get(6)?,
        account: row.get(7)?,
    })
}

/// Create a transaction for `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidAccount] if the account is set but does not belong
/// to the user.
pub fn create_transaction(
    user_id: UserID,
    data: &TransactionData,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(account_id) = data.account_id {
        check_account_owner(user_id, account_id, connection)?;
    }

    let id: TransactionId = connection.query_row(
        "INSERT INTO \"transaction\"
            (user_id, account_id, name, amount, transaction_type, category, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id",
        (
            user_id.as_i64(),
            data.account_id,
            &data.name,
            data.amount,
            data.transaction_type,
            data.category,
            data.date,
        ),
        |row| row.get(0),
    )?;

    get_transaction(user_id, id, connection)
}

/// Replace the fields of the transaction `transaction_id` owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no such transaction, or
/// [Error::InvalidAccount] if the new account belongs to someone else.
pub fn update_transaction(
    user_id: UserID,
    transaction_id: TransactionId,
    data: &TransactionData,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(account_id) = data.account_id {
        check_account_owner(user_id, account_id, connection)?;
    }

    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET account_id = ?1, name = ?2, amount = ?3,
            transaction_type = ?4, category = ?5, date = ?6
        WHERE id = ?7 AND user_id = ?8",
        (
            data.account_id,
            &data.name,
            data.amount,
            data.transaction_type,
            data.category,
            data.date,
            transaction_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_transaction(user_id, transaction_id, connection)
}

pub fn delete_transaction(
    user_id: UserID,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (transaction_id, user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

pub fn get_transaction(
    user_id: UserID,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.id = ?1 AND t.user_id = ?2"
        ))?
        .query_row((transaction_id, user_id.as_i64()), map_transaction_row)
        .map_err(Error::from)
}

/// Get the transactions of `user_id`, newest date first.
///
/// At most `limit` transactions are returned if a limit is given.
pub fn get_transactions(
    user_id: UserID,
    limit: Option<u32>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    // A negative limit means no limit in SQLite.
    let limit = limit.map_or(-1, i64::from);

    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE t.user_id = ?1 ORDER BY t.date DESC, t.id DESC LIMIT ?2"
        ))?
        .query_map((user_id.as_i64(), limit), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Sum the income and expenses of `user_id` over all time.
pub fn get_transaction_totals(
    user_id: UserID,
    connection: &Connection,
) -> Result<TransactionTotals, Error> {
    connection
        .query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'income' THEN amount END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'expense' THEN amount END), 0)
            FROM \"transaction\" WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| {
                Ok(TransactionTotals {
                    income: row.get(0)?,
                    expense: row.get(1)?,
                })
            },
        )
        .map_err(Error::from)
}

/// Sum the expenses of `user_id` per category between `start` and `end` inclusive.
pub fn get_expenses_by_category(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<HashMap<Category, f64>, Error> {
    connection
        .prepare(
            "SELECT category, SUM(amount) FROM \"transaction\"
            WHERE user_id = ?1 AND transaction_type = 'expense' AND date BETWEEN ?2 AND ?3
            GROUP BY category",
        )?
        .query_map((user_id.as_i64(), start, end), |row| {
            Ok((row.get::<_, Category>(0)?, row.get::<_, f64>(1)?))
        })?
        .map(|maybe_row| maybe_row.map_err(Error::from))
        .collect()
}


#[cfg(test)]
mod builder_tests {
    use time::macros::date;

    use crate::Error;

    use super::{Category, Transaction, TransactionType};

    #[test]
    fn defaults_to_other_category_without_account() {
        let builder = Transaction::build("Coffee", 250.0, TransactionType::Expense, date!(2025 - 01 - 15));

        assert_eq!(builder.category, Category::Other);
        assert_eq!(builder.account_id, None);
        assert!(builder.finalise().is_ok());
    }

    #[test]
    fn rejects_zero_amount() {
        let result =
            Transaction::build("Coffee", 0.0, TransactionType::Expense, date!(2025 - 01 - 15))
                .finalise();

        assert_eq!(result, Err(Error::NonPositiveAmount("amount")));
    }

    #[test]
    fn rejects_empty_name() {
        let result =
            Transaction::build("  ", 10.0, TransactionType::Income, date!(2025 - 01 - 15))
                .finalise();

        assert_eq!(result, Err(Error::EmptyField("name")));
    }
}

#[cfg(test)]
mod query_tests {
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountData, AccountType, create_account},
        test_utils::{get_test_connection, must_create_user},
    };

    use super::{
        Category, Transaction, TransactionTotals, TransactionType, create_transaction,
        delete_transaction, get_expenses_by_category, get_transaction, get_transaction_totals,
        get_transactions, update_transaction,
    };

    #[test]
    fn create_with_account_includes_account_name() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(
            user_id,
            &AccountData::new("Card", 0.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let data = Transaction::build("Salary", 5000.0, TransactionType::Income, date!(2025 - 01 - 31))
            .category(Category::Income)
            .account_id(Some(account.id))
            .finalise()
            .unwrap();

        let transaction = create_transaction(user_id, &data, &connection).unwrap();

        assert_eq!(transaction.account_id, Some(account.id));
        assert_eq!(transaction.account.as_deref(), Some("Card"));
        assert_eq!(transaction.category, Category::Income);
        assert_eq!(get_transaction(user_id, transaction.id, &connection), Ok(transaction));
    }

    #[test]
    fn rejects_other_users_account() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let account = create_account(
            olga,
            &AccountData::new("Olga's card", 0.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let data = Transaction::build("Coffee", 5.0, TransactionType::Expense, date!(2025 - 01 - 31))
            .account_id(Some(account.id))
            .finalise()
            .unwrap();

        assert_eq!(
            create_transaction(ivan, &data, &connection),
            Err(Error::InvalidAccount(account.id))
        );
    }

    #[test]
    fn deleting_account_keeps_transaction() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(
            user_id,
            &AccountData::new("Card", 0.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let data = Transaction::build("Coffee", 5.0, TransactionType::Expense, date!(2025 - 01 - 31))
            .account_id(Some(account.id))
            .finalise()
            .unwrap();
        let transaction = create_transaction(user_id, &data, &connection).unwrap();

        crate::account::delete_account(user_id, account.id, &connection).unwrap();

        let got = get_transaction(user_id, transaction.id, &connection).unwrap();
        assert_eq!(got.account_id, None);
        assert_eq!(got.account, None);
    }

    #[test]
    fn transactions_are_newest_first_with_limit() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        for (name, date) in [
            ("Old", date!(2024 - 12 - 01)),
            ("New", date!(2025 - 02 - 01)),
            ("Middle", date!(2025 - 01 - 01)),
        ] {
            let data = Transaction::build(name, 1.0, TransactionType::Expense, date)
                .finalise()
                .unwrap();
            create_transaction(user_id, &data, &connection).unwrap();
        }

        let names: Vec<String> = get_transactions(user_id, None, &connection)
            .unwrap()
            .into_iter()
            .map(|transaction| transaction.name)
            .collect();
        assert_eq!(names, ["New", "Middle", "Old"]);

        assert_eq!(get_transactions(user_id, Some(2), &connection).unwrap().len(), 2);
    }

    #[test]
    fn update_and_delete_are_scoped_to_owner() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let data = Transaction::build("Coffee", 5.0, TransactionType::Expense, date!(2025 - 01 - 31))
            .finalise()
            .unwrap();
        let transaction = create_transaction(ivan, &data, &connection).unwrap();
        let new_data = Transaction::build("Tea", 3.0, TransactionType::Expense, date!(2025 - 02 - 01))
            .category(Category::Food)
            .finalise()
            .unwrap();

        assert_eq!(
            update_transaction(olga, transaction.id, &new_data, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_transaction(olga, transaction.id, &connection),
            Err(Error::NotFound)
        );

        let updated = update_transaction(ivan, transaction.id, &new_data, &connection).unwrap();
        assert_eq!(updated.name, "Tea");
        assert_eq!(updated.category, Category::Food);
        assert_eq!(updated.date, date!(2025 - 02 - 01));

        assert_eq!(delete_transaction(ivan, transaction.id, &connection), Ok(()));
    }

    #[test]
    fn totals_sum_income_and_expenses() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        for (amount, transaction_type) in [
            (3000.0, TransactionType::Income),
            (2000.0, TransactionType::Income),
            (1500.0, TransactionType::Expense),
            (500.0, TransactionType::Expense),
        ] {
            let data = Transaction::build("x", amount, transaction_type, date!(2025 - 01 - 01))
                .finalise()
                .unwrap();
            create_transaction(user_id, &data, &connection).unwrap();
        }

        let totals = get_transaction_totals(user_id, &connection).unwrap();

        assert_eq!(
            totals,
            TransactionTotals {
                income: 5000.0,
                expense: 2000.0
            }
        );
        assert_eq!(totals.net(), 3000.0);
    }

    #[test]
    fn expenses_by_category_only_counts_range() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        for (amount, category, transaction_type, date) in [
            (100.0, Category::Food, TransactionType::Expense, date!(2025 - 03 - 01)),
            (50.0, Category::Food, TransactionType::Expense, date!(2025 - 03 - 31)),
            (70.0, Category::Transport, TransactionType::Expense, date!(2025 - 03 - 15)),
            (999.0, Category::Food, TransactionType::Expense, date!(2025 - 04 - 01)),
            (999.0, Category::Food, TransactionType::Income, date!(2025 - 03 - 10)),
        ] {
            let data = Transaction::build("x", amount, transaction_type, date)
                .category(category)
                .finalise()
                .unwrap();
            create_transaction(user_id, &data, &connection).unwrap();
        }

        let expenses = get_expenses_by_category(
            user_id,
            date!(2025 - 03 - 01),
            date!(2025 - 03 - 31),
            &connection,
        )
        .unwrap();

        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[&Category::Food], 150.0);
        assert_eq!(expenses[&Category::Transport], 70.0);
    }
}
