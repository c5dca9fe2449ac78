//! Monthly budgets per category of expenses.

mod api;
mod categories_page;
mod core;
mod usage;

pub use api::{delete_category_endpoint, list_categories, save_category_endpoint};
pub use categories_page::{
    budget_status_html, delete_category_form_endpoint, get_categories_page,
    save_category_form_endpoint, status_style,
};
pub use core::{
    BudgetCategory, BudgetCategoryData, BudgetCategoryId, create_budget_category,
    create_budget_category_table, delete_budget_category, get_budget_categories,
    save_budget_category,
};
pub use usage::{BudgetStatus, BudgetUsage, get_budget_usage, month_bounds};
