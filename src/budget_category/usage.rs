//! How much of each monthly budget has been spent.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    auth::UserID,
    budget_category::core::{BudgetCategory, get_budget_categories},
    transaction::{Category, get_expenses_by_category},
};

/// Spending at or above this share of the budget shows a warning.
const WARNING_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetStatus {
    /// The budget is zero.
    NoBudget,
    /// Less than 90% of the budget has been spent.
    Good,
    /// At least 90% of the budget has been spent.
    Warning,
    /// More than the budget has been spent, by `overspent`.
    OverBudget { overspent: f64 },
}

impl BudgetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BudgetStatus::NoBudget => "No budget",
            BudgetStatus::Good => "On track",
            BudgetStatus::Warning => "Almost spent",
            BudgetStatus::OverBudget { .. } => "Over budget",
        }
    }
}

/// A budget category and what has been spent in it this month.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUsage {
    pub category: BudgetCategory,
    pub spent: f64,
    pub status: BudgetStatus,
    /// Between 0 and 100.
    pub progress_percent: u8,
}

impl BudgetUsage {
    pub fn new(category: BudgetCategory, spent: f64) -> Self {
        let budget = category.budget;

        let status = if budget <= 0.0 {
            BudgetStatus::NoBudget
        } else if spent > budget {
            BudgetStatus::OverBudget {
                overspent: spent - budget,
            }
        } else if spent >= budget * WARNING_THRESHOLD {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Good
        };

        let progress_percent = if budget <= 0.0 {
            0
        } else {
            (spent / budget * 100.0).clamp(0.0, 100.0) as u8
        };

        Self {
            category,
            spent,
            status,
            progress_percent,
        }
    }
}

/// The first and last day of the month that `date` falls in.
pub fn month_bounds(date: Date) -> (Date, Date) {
    let mut start = date;
    while let Some(previous) = start.previous_day() {
        if previous.month() != date.month() {
            break;
        }
        start = previous;
    }

    let mut end = date;
    while let Some(next) = end.next_day() {
        if next.month() != date.month() {
            break;
        }
        end = next;
    }

    (start, end)
}

/// Get the budget categories of `user_id` with the expenses in the month of `today`.
///
/// A budget category counts the expenses whose transaction category has the
/// same name, ignoring case. Budget categories that match no transaction
/// category have nothing spent.
pub fn get_budget_usage(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<BudgetUsage>, Error> {
    let (start, end) = month_bounds(today);
    let expenses = get_expenses_by_category(user_id, start, end, connection)?;

    let usage = get_budget_categories(user_id, connection)?
        .into_iter()
        .map(|category| {
            let spent = Category::from_budget_name(&category.name)
                .and_then(|transaction_category| expenses.get(&transaction_category).copied())
                .unwrap_or_default();

            BudgetUsage::new(category, spent)
        })
        .collect();

    Ok(usage)
}
