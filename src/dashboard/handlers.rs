//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::get_total_account_balance,
    auth::UserID,
    budget_category::{BudgetUsage, get_budget_usage},
    dashboard::cards::{budget_cards_view, goal_cards_view, total_card},
    endpoints,
    goal::{Goal, GoalProgress, get_goals_with_progress},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency,
    },
    navigation::NavBar,
    timezone::local_today,
    transaction::{
        Transaction, TransactionTotals, TransactionType, get_transaction_totals, get_transactions,
    },
};

/// The number of transactions shown in the latest transactions table.
const LATEST_TRANSACTIONS_COUNT: u32 = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Moscow".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    total_balance: f64,
    totals: TransactionTotals,
    goals: Vec<(Goal, GoalProgress)>,
    latest_transactions: Vec<Transaction>,
    budget_usage: Vec<BudgetUsage>,
}

/// Display a page with an overview of the user's money.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone);
    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        DashboardData {
            total_balance: get_total_account_balance(user_id, &connection)?,
            totals: get_transaction_totals(user_id, &connection)?,
            goals: get_goals_with_progress(user_id, &connection)?,
            latest_transactions: get_transactions(
                user_id,
                Some(LATEST_TRANSACTIONS_COUNT),
                &connection,
            )?,
            budget_usage: get_budget_usage(user_id, today, &connection)?,
        }
    };

    Ok(dashboard_view(&data).into_response())
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-8"
            {
                section class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
                {
                    (total_card("Balance", data.total_balance, ""))
                    (total_card("Income", data.totals.income, "text-green-600 dark:text-green-400"))
                    (total_card("Expenses", data.totals.expense, "text-red-600 dark:text-red-400"))
                    (total_card("Net", data.totals.net(), ""))
                }

                (goal_cards_view(&data.goals))

                (latest_transactions_view(&data.latest_transactions))

                (budget_cards_view(&data.budget_usage))
            }
        }
    };

    base("Dashboard", &content)
}

fn latest_transactions_view(transactions: &[Transaction]) -> Markup {
    html! {
        section class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Latest transactions" }
                a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "See all" }
            }

            @if transactions.is_empty() {
                p class="text-gray-600 dark:text-gray-400"
                {
                    "No transactions yet."
                }
            } @else {
                div class="w-full overflow-x-auto dark:bg-gray-800"
                {
                    table
                        id="latest-transactions"
                        class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class="px-6 py-3 text-right" { "Amount" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.name) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (transaction.category.emoji()) " " (transaction.category.label())
                                    }
                                    @match transaction.transaction_type {
                                        TransactionType::Income => {
                                            td class="px-6 py-4 text-right tabular-nums text-green-600 dark:text-green-400"
                                            {
                                                "+" (format_currency(transaction.amount))
                                            }
                                        }
                                        TransactionType::Expense => {
                                            td class="px-6 py-4 text-right tabular-nums"
                                            {
                                                "-" (format_currency(transaction.amount))
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
