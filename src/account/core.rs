use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::UserID,
    validation::{non_negative_amount, required_text},
};

pub type AccountId = i64;

/// The kind of place the money is kept in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Deposit,
    Debit,
    Credit,
    Savings,
    Investment,
    Cash,
    #[default]
    Other,
}

impl AccountType {
    pub const ALL: [AccountType; 7] = [
        AccountType::Deposit,
        AccountType::Debit,
        AccountType::Credit,
        AccountType::Savings,
        AccountType::Investment,
        AccountType::Cash,
        AccountType::Other,
    ];

    /// The value stored in the database and sent over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Deposit => "deposit",
            AccountType::Debit => "debit",
            AccountType::Credit => "credit",
            AccountType::Savings => "savings",
            AccountType::Investment => "investment",
            AccountType::Cash => "cash",
            AccountType::Other => "other",
        }
    }

    /// The name shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Deposit => "Deposit",
            AccountType::Debit => "Debit card",
            AccountType::Credit => "Credit card",
            AccountType::Savings => "Savings",
            AccountType::Investment => "Investment",
            AccountType::Cash => "Cash",
            AccountType::Other => "Other",
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|account_type| account_type.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidAccountType(s.to_owned()))
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

/// A place where the user keeps money, e.g. a bank card or cash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// The balance, never negative.
    pub amount: f64,
    pub account_type: AccountType,
    pub description: String,
}

/// Validated fields for creating or updating an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountData {
    pub name: String,
    pub amount: f64,
    pub account_type: AccountType,
    pub description: String,
}

impl AccountData {
    pub const MAX_NAME_LENGTH: usize = 100;

    /// # Errors
    ///
    /// Returns an error if the name is empty or longer than
    /// [AccountData::MAX_NAME_LENGTH] characters, or if the amount is negative.
    pub fn new(
        name: &str,
        amount: f64,
        account_type: AccountType,
        description: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: required_text("name", name, Self::MAX_NAME_LENGTH)?,
            amount: non_negative_amount("amount", amount)?,
            account_type,
            description: description.trim().to_owned(),
        })
    }
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            account_type TEXT NOT NULL DEFAULT 'other',
            description TEXT NOT NULL DEFAULT ''
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user_id ON account(user_id)",
        (),
    )?;

    Ok(())
}

pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        account_type: row.get(3)?,
        description: row.get(4)?,
    })
}

pub fn create_account(
    user_id: UserID,
    data: &AccountData,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (user_id, name, amount, account_type, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, name, amount, account_type, description",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &data.name,
                data.amount,
                data.account_type,
                &data.description,
            ),
            map_account_row,
        )
        .map_err(Error::from)
}

/// Replace the fields of the account `account_id` owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no account with that ID.
pub fn update_account(
    user_id: UserID,
    account_id: AccountId,
    data: &AccountData,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "UPDATE account SET name = ?1, amount = ?2, account_type = ?3, description = ?4
            WHERE id = ?5 AND user_id = ?6
            RETURNING id, name, amount, account_type, description",
        )?
        .query_row(
            (
                &data.name,
                data.amount,
                data.account_type,
                &data.description,
                account_id,
                user_id.as_i64(),
            ),
            map_account_row,
        )
        .map_err(Error::from)
}

/// Delete an account. Transactions that used the account are kept without an account.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no account with that ID.
pub fn delete_account(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
        (account_id, user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

pub fn get_account(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, account_type, description FROM account
            WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((account_id, user_id.as_i64()), map_account_row)
        .map_err(Error::from)
}

/// Get the accounts of `user_id`, newest first.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, account_type, description FROM account
            WHERE user_id = ?1 ORDER BY id DESC",
        )?
        .query_map([user_id.as_i64()], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Check that `account_id` belongs to `user_id`.
///
/// # Errors
///
/// Returns [Error::InvalidAccount] if the account does not exist or belongs to
/// someone else.
pub fn check_account_owner(
    user_id: UserID,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    match get_account(user_id, account_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => Err(Error::InvalidAccount(account_id)),
        Err(error) => Err(error),
    }
}

/// Get the total balance across the accounts of `user_id`.
pub fn get_total_account_balance(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM account WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        connection
            .execute("CREATE TABLE user (id INTEGER PRIMARY KEY)", ())
            .unwrap();

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}

#[cfg(test)]
mod account_type_tests {
    use crate::Error;

    use super::AccountType;

    #[test]
    fn parses_every_type() {
        for account_type in AccountType::ALL {
            assert_eq!(account_type.as_str().parse(), Ok(account_type));
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(
            "wallet".parse::<AccountType>(),
            Err(Error::InvalidAccountType("wallet".to_owned()))
        );
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&AccountType::Investment).unwrap(),
            "\"investment\""
        );
    }
}

#[cfg(test)]
mod account_data_tests {
    use crate::Error;

    use super::{AccountData, AccountType};

    #[test]
    fn accepts_zero_amount() {
        let data = AccountData::new(" Cash ", 0.0, AccountType::Cash, "").unwrap();

        assert_eq!(data.name, "Cash");
        assert_eq!(data.amount, 0.0);
    }

    #[test]
    fn rejects_negative_amount() {
        assert_eq!(
            AccountData::new("Cash", -1.0, AccountType::Cash, ""),
            Err(Error::NegativeAmount("amount"))
        );
    }

    #[test]
    fn rejects_long_name() {
        assert_eq!(
            AccountData::new(&"a".repeat(101), 1.0, AccountType::Cash, ""),
            Err(Error::TooLong {
                field: "name",
                max: AccountData::MAX_NAME_LENGTH
            })
        );
    }
}

#[cfg(test)]
mod account_query_tests {
    use crate::{
        Error,
        test_utils::{get_test_connection, must_create_user},
    };

    use super::{
        AccountData, AccountType, check_account_owner, create_account, delete_account,
        get_account, get_accounts, get_total_account_balance, update_account,
    };

    fn data(name: &str, amount: f64) -> AccountData {
        AccountData::new(name, amount, AccountType::Debit, "").unwrap()
    }

    #[test]
    fn create_then_get() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);

        let created = create_account(user_id, &data("Card", 1500.0), &connection).unwrap();
        let got = get_account(user_id, created.id, &connection).unwrap();

        assert_eq!(created, got);
        assert_eq!(got.account_type, AccountType::Debit);
    }

    #[test]
    fn accounts_are_newest_first_and_scoped_to_user() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let first = create_account(ivan, &data("First", 1.0), &connection).unwrap();
        let second = create_account(ivan, &data("Second", 2.0), &connection).unwrap();
        create_account(olga, &data("Olga's", 3.0), &connection).unwrap();

        let accounts = get_accounts(ivan, &connection).unwrap();

        assert_eq!(accounts, vec![second, first]);
    }

    #[test]
    fn cannot_touch_other_users_account() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let account = create_account(ivan, &data("Card", 1.0), &connection).unwrap();

        assert_eq!(get_account(olga, account.id, &connection), Err(Error::NotFound));
        assert_eq!(
            update_account(olga, account.id, &data("Mine", 5.0), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(delete_account(olga, account.id, &connection), Err(Error::NotFound));
        assert_eq!(
            check_account_owner(olga, account.id, &connection),
            Err(Error::InvalidAccount(account.id))
        );
        assert_eq!(check_account_owner(ivan, account.id, &connection), Ok(()));
    }

    #[test]
    fn update_replaces_fields() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(user_id, &data("Card", 1.0), &connection).unwrap();
        let new_data =
            AccountData::new("Piggy bank", 250.0, AccountType::Savings, "for a rainy day")
                .unwrap();

        let updated = update_account(user_id, account.id, &new_data, &connection).unwrap();

        assert_eq!(updated.name, "Piggy bank");
        assert_eq!(updated.amount, 250.0);
        assert_eq!(updated.account_type, AccountType::Savings);
        assert_eq!(updated.description, "for a rainy day");
    }

    #[test]
    fn delete_removes_account() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(user_id, &data("Card", 1.0), &connection).unwrap();

        assert_eq!(delete_account(user_id, account.id, &connection), Ok(()));
        assert_eq!(get_accounts(user_id, &connection), Ok(vec![]));
    }

    #[test]
    fn total_balance_sums_users_accounts() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        create_account(ivan, &data("A", 100.5), &connection).unwrap();
        create_account(ivan, &data("B", 250.25), &connection).unwrap();
        create_account(olga, &data("C", 1000.0), &connection).unwrap();

        assert_eq!(get_total_account_balance(ivan, &connection), Ok(350.75));
        assert_eq!(
            get_total_account_balance(must_create_user("empty", &connection), &connection),
            Ok(0.0)
        );
    }
}
