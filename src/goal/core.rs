use rusqlite::{Connection, Row};

use crate::{
    Error,
    account::{AccountId, check_account_owner},
    auth::UserID,
    validation::{non_negative_amount, positive_amount, required_text},
};

pub type GoalId = i64;

/// An amount of money the user is saving towards.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
    pub target_amount: f64,
    /// An amount entered by hand, kept for older clients. Progress is
    /// calculated from transactions and linked accounts instead.
    pub current_amount: f64,
    /// Only count the balances of the linked accounts towards the goal.
    pub use_only_linked_accounts: bool,
    pub linked_account_ids: Vec<AccountId>,
}

/// Validated fields for creating or updating a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalData {
    pub name: String,
    pub target_amount: f64,
    /// `None` keeps the current amount of an existing goal, or zero for a new goal.
    pub current_amount: Option<f64>,
    pub use_only_linked_accounts: bool,
    pub linked_account_ids: Vec<AccountId>,
}

impl GoalData {
    pub const MAX_NAME_LENGTH: usize = 200;

    /// # Errors
    ///
    /// Returns an error if the name is empty or too long, the target is not
    /// greater than zero or the current amount is negative.
    pub fn new(
        name: &str,
        target_amount: f64,
        current_amount: Option<f64>,
        use_only_linked_accounts: bool,
        mut linked_account_ids: Vec<AccountId>,
    ) -> Result<Self, Error> {
        let current_amount = current_amount
            .map(|amount| non_negative_amount("current amount", amount))
            .transpose()?;
        linked_account_ids.sort_unstable();
        linked_account_ids.dedup();

        Ok(Self {
            name: required_text("name", name, Self::MAX_NAME_LENGTH)?,
            target_amount: positive_amount("target amount", target_amount)?,
            current_amount,
            use_only_linked_accounts,
            linked_account_ids,
        })
    }
}

/// Create the goal table and the table linking goals to accounts.
pub fn create_goal_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            target_amount REAL NOT NULL CHECK (target_amount > 0),
            current_amount REAL NOT NULL DEFAULT 0 CHECK (current_amount >= 0),
            use_only_linked_accounts INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal_account (
            goal_id INTEGER NOT NULL REFERENCES goal(id) ON DELETE CASCADE,
            account_id INTEGER NOT NULL REFERENCES account(id) ON DELETE CASCADE,
            PRIMARY KEY (goal_id, account_id)
        )",
        (),
    )?;

    Ok(())
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount: row.get(2)?,
        current_amount: row.get(3)?,
        use_only_linked_accounts: row.get(4)?,
        linked_account_ids: Vec::new(),
    })
}

fn get_linked_account_ids(
    goal_id: GoalId,
    connection: &Connection,
) -> Result<Vec<AccountId>, Error> {
    connection
        .prepare("SELECT account_id FROM goal_account WHERE goal_id = ?1 ORDER BY account_id")?
        .query_map([goal_id], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

/// Create a goal (`goal_id` is `None`) or update an existing one, replacing its linked accounts.
///
/// # Errors
///
/// Returns [Error::NotFound] if `goal_id` is not one of the user's goals, or
/// [Error::InvalidAccount] if a linked account belongs to someone else.
pub fn save_goal(
    user_id: UserID,
    goal_id: Option<GoalId>,
    data: &GoalData,
    connection: &Connection,
) -> Result<Goal, Error> {
    let transaction = connection.unchecked_transaction()?;

    for &account_id in &data.linked_account_ids {
        check_account_owner(user_id, account_id, &transaction)?;
    }

    let goal_id = match goal_id {
        Some(goal_id) => {
            let rows_affected = transaction.execute(
                "UPDATE goal SET name = ?1, target_amount = ?2,
                    current_amount = COALESCE(?3, current_amount), use_only_linked_accounts = ?4
                WHERE id = ?5 AND user_id = ?6",
                (
                    &data.name,
                    data.target_amount,
                    data.current_amount,
                    data.use_only_linked_accounts,
                    goal_id,
                    user_id.as_i64(),
                ),
            )?;

            if rows_affected == 0 {
                return Err(Error::NotFound);
            }

            goal_id
        }
        None => transaction.query_row(
            "INSERT INTO goal (user_id, name, target_amount, current_amount, use_only_linked_accounts)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id",
            (
                user_id.as_i64(),
                &data.name,
                data.target_amount,
                data.current_amount.unwrap_or_default(),
                data.use_only_linked_accounts,
            ),
            |row| row.get(0),
        )?,
    };

    transaction.execute("DELETE FROM goal_account WHERE goal_id = ?1", [goal_id])?;
    {
        let mut statement = transaction
            .prepare("INSERT INTO goal_account (goal_id, account_id) VALUES (?1, ?2)")?;

        for &account_id in &data.linked_account_ids {
            statement.execute((goal_id, account_id))?;
        }
    }

    let goal = get_goal(user_id, goal_id, &transaction)?;
    transaction.commit()?;

    Ok(goal)
}

pub fn get_goal(user_id: UserID, goal_id: GoalId, connection: &Connection) -> Result<Goal, Error> {
    let mut goal = connection
        .prepare(
            "SELECT id, name, target_amount, current_amount, use_only_linked_accounts FROM goal
            WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((goal_id, user_id.as_i64()), map_goal_row)?;
    goal.linked_account_ids = get_linked_account_ids(goal.id, connection)?;

    Ok(goal)
}

/// Get the goals of `user_id` with their linked accounts, newest first.
pub fn get_goals(user_id: UserID, connection: &Connection) -> Result<Vec<Goal>, Error> {
    let goals = connection
        .prepare(
            "SELECT id, name, target_amount, current_amount, use_only_linked_accounts FROM goal
            WHERE user_id = ?1 ORDER BY id DESC",
        )?
        .query_map([user_id.as_i64()], map_goal_row)?
        .collect::<Result<Vec<_>, _>>()?;

    goals
        .into_iter()
        .map(|mut goal| {
            goal.linked_account_ids = get_linked_account_ids(goal.id, connection)?;
            Ok(goal)
        })
        .collect()
}

pub fn delete_goal(user_id: UserID, goal_id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Sum the balances of the accounts linked to `goal_id`.
pub fn get_linked_accounts_sum(goal_id: GoalId, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(a.amount), 0) FROM goal_account ga
            JOIN account a ON a.id = ga.account_id
            WHERE ga.goal_id = ?1",
            [goal_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}
