use rusqlite::{Connection, Row};
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    Error,
    auth::UserID,
    validation::{non_negative_amount, required_text},
};

pub type BudgetCategoryId = i64;

/// A monthly spending limit for a category of expenses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetCategory {
    pub id: BudgetCategoryId,
    pub name: String,
    /// The monthly budget, zero means no budget has been set.
    pub budget: f64,
    pub emoji: String,
}

/// Validated fields for a budget category.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetCategoryData {
    pub name: String,
    pub budget: f64,
    pub emoji: String,
}

impl BudgetCategoryData {
    pub const MAX_NAME_LENGTH: usize = 50;
    /// Counted in graphemes so that emoji made of several code points count once.
    pub const MAX_EMOJI_LENGTH: usize = 10;

    /// # Errors
    ///
    /// Returns an error if the name is empty or too long, the budget is
    /// negative or the emoji is too long.
    pub fn new(name: &str, budget: f64, emoji: &str) -> Result<Self, Error> {
        let emoji = emoji.trim();

        if emoji.graphemes(true).count() > Self::MAX_EMOJI_LENGTH {
            return Err(Error::TooLong {
                field: "emoji",
                max: Self::MAX_EMOJI_LENGTH,
            });
        }

        Ok(Self {
            name: required_text("category name", name, Self::MAX_NAME_LENGTH)?,
            budget: non_negative_amount("budget", budget)?,
            emoji: emoji.to_owned(),
        })
    }
}

pub fn create_budget_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget_category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            budget REAL NOT NULL DEFAULT 0 CHECK (budget >= 0),
            emoji TEXT NOT NULL DEFAULT '',
            UNIQUE (user_id, name)
        )",
        (),
    )?;

    Ok(())
}

fn map_budget_category_row(row: &Row) -> Result<BudgetCategory, rusqlite::Error> {
    Ok(BudgetCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        budget: row.get(2)?,
        emoji: row.get(3)?,
    })
}

/// Create a budget category, failing if the user already has one with the same name.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if the name is taken.
pub fn create_budget_category(
    user_id: UserID,
    data: &BudgetCategoryData,
    connection: &Connection,
) -> Result<BudgetCategory, Error> {
    connection
        .query_row(
            "INSERT INTO budget_category (user_id, name, budget, emoji) VALUES (?1, ?2, ?3, ?4)
            RETURNING id, name, budget, emoji",
            (user_id.as_i64(), &data.name, data.budget, &data.emoji),
            map_budget_category_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 2067 => {
                Error::DuplicateCategoryName(data.name.clone())
            }
            error => error.into(),
        })
}

/// Create the category named `data.name`, or set the budget and emoji of the
/// existing category with that name.
pub fn save_budget_category(
    user_id: UserID,
    data: &BudgetCategoryData,
    connection: &Connection,
) -> Result<BudgetCategory, Error> {
    connection
        .query_row(
            "INSERT INTO budget_category (user_id, name, budget, emoji) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (user_id, name) DO UPDATE SET budget = excluded.budget, emoji = excluded.emoji
            RETURNING id, name, budget, emoji",
            (user_id.as_i64(), &data.name, data.budget, &data.emoji),
            map_budget_category_row,
        )
        .map_err(Error::from)
}

/// Get the budget categories of `user_id` ordered by name.
pub fn get_budget_categories(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<BudgetCategory>, Error> {
    connection
        .prepare(
            "SELECT id, name, budget, emoji FROM budget_category
            WHERE user_id = ?1 ORDER BY name",
        )?
        .query_map([user_id.as_i64()], map_budget_category_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

pub fn delete_budget_category(
    user_id: UserID,
    category_id: BudgetCategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget_category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}


#[cfg(test)]
mod query_tests {
    use crate::{
        Error,
        test_utils::{get_test_connection, must_create_user},
    };

    use super::{
        BudgetCategoryData, create_budget_category, delete_budget_category,
        get_budget_categories, save_budget_category,
    };

    #[test]
    fn save_updates_category_with_same_name() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);

        let created = save_budget_category(
            user_id,
            &BudgetCategoryData::new("Food", 10000.0, "🍔").unwrap(),
            &connection,
        )
        .unwrap();
        let updated = save_budget_category(
            user_id,
            &BudgetCategoryData::new("Food", 12000.0, "🥦").unwrap(),
            &connection,
        )
        .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.budget, 12000.0);
        assert_eq!(updated.emoji, "🥦");
        assert_eq!(get_budget_categories(user_id, &connection), Ok(vec![updated]));
    }

    #[test]
    fn names_are_unique_per_user() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let data = BudgetCategoryData::new("Food", 100.0, "").unwrap();

        create_budget_category(ivan, &data, &connection).unwrap();

        assert_eq!(
            create_budget_category(ivan, &data, &connection),
            Err(Error::DuplicateCategoryName("Food".to_owned()))
        );
        assert!(create_budget_category(olga, &data, &connection).is_ok());
    }

    #[test]
    fn ordered_by_name() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        for name in ["Transport", "Food", "Health"] {
            save_budget_category(
                user_id,
                &BudgetCategoryData::new(name, 0.0, "").unwrap(),
                &connection,
            )
            .unwrap();
        }

        let names: Vec<String> = get_budget_categories(user_id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(names, ["Food", "Health", "Transport"]);
    }

    #[test]
    fn delete_is_scoped_to_owner() {
        let connection = get_test_connection();
        let ivan = must_create_user("ivan", &connection);
        let olga = must_create_user("olga", &connection);
        let category = save_budget_category(
            ivan,
            &BudgetCategoryData::new("Food", 0.0, "").unwrap(),
            &connection,
        )
        .unwrap();

        assert_eq!(
            delete_budget_category(olga, category.id, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(delete_budget_category(ivan, category.id, &connection), Ok(()));
        assert_eq!(get_budget_categories(ivan, &connection), Ok(vec![]));
    }
}
