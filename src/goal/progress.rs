//! Works out how far along a goal is.

use rusqlite::Connection;

use crate::{
    Error,
    auth::UserID,
    goal::core::{Goal, get_goals, get_linked_accounts_sum},
    transaction::{TransactionTotals, get_transaction_totals},
};

/// The amount counted towards a goal and how much of the target it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    /// Negative when expenses exceed income and linked balances.
    pub calculated_amount: f64,
    /// A whole percentage between 0 and 100.
    pub progress_percent: u8,
}

/// Calculate the progress of a goal.
///
/// The amount counted towards a goal is the balance of its linked accounts.
/// Unless the goal only uses linked accounts, the user's net income
/// (all income minus all expenses) is added on top.
pub fn calculate_progress(
    target_amount: f64,
    use_only_linked_accounts: bool,
    totals: TransactionTotals,
    linked_accounts_sum: f64,
) -> GoalProgress {
    let calculated_amount = if use_only_linked_accounts {
        linked_accounts_sum
    } else {
        totals.net() + linked_accounts_sum
    };

    GoalProgress {
        calculated_amount,
        progress_percent: progress_percent(calculated_amount, target_amount),
    }
}

fn progress_percent(amount: f64, target_amount: f64) -> u8 {
    if target_amount <= 0.0 || amount <= 0.0 {
        return 0;
    }

    (amount / target_amount * 100.0).floor().min(100.0) as u8
}

/// Get the goals of `user_id` together with their progress.
pub fn get_goals_with_progress(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<(Goal, GoalProgress)>, Error> {
    let totals = get_transaction_totals(user_id, connection)?;

    get_goals(user_id, connection)?
        .into_iter()
        .map(|goal| {
            let linked_accounts_sum = get_linked_accounts_sum(goal.id, connection)?;
            let progress = calculate_progress(
                goal.target_amount,
                goal.use_only_linked_accounts,
                totals,
                linked_accounts_sum,
            );

            Ok((goal, progress))
        })
        .collect()
}
