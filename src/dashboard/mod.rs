//! The dashboard: an overview of balances, goals, recent transactions and budgets.

mod cards;
mod handlers;

pub use handlers::get_dashboard_page;
