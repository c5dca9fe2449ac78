//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/accounts/{account_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for listing and creating accounts.
pub const ACCOUNTS_VIEW: &str = "/accounts";
/// The page for listing and creating transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for listing and creating savings goals.
pub const GOALS_VIEW: &str = "/goals";
/// The page for listing and creating budget categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page showing the user's name and export/import links.
pub const PROFILE_VIEW: &str = "/profile";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page shown to users that are blocked after too many failed log-in attempts.
pub const ACCOUNT_LOCKED_VIEW: &str = "/account_locked";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";

/// The route to list and create accounts.
pub const ACCOUNTS_API: &str = "/api/accounts";
/// The route to update or delete a single account.
pub const ACCOUNT_API: &str = "/api/accounts/{account_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
/// The route to list goals with their progress.
pub const GOALS_API: &str = "/api/goals";
/// The route to create or update a goal.
pub const SAVE_GOAL_API: &str = "/api/goals/save";
/// The route to delete a goal, with the goal ID in the JSON body.
pub const DELETE_GOAL_API: &str = "/api/goals/delete";
/// The route to list budget categories.
pub const CATEGORIES_API: &str = "/api/categories";
/// The route to create or update a budget category by name.
pub const SAVE_CATEGORY_API: &str = "/api/categories/save";
/// The route to delete a budget category.
pub const DELETE_CATEGORY_API: &str = "/api/categories/delete";
/// The route to download the user's data as JSON.
pub const EXPORT_API: &str = "/api/export";
/// The route to upload a JSON export.
pub const IMPORT_API: &str = "/api/import";

/// The HTMX route for the create account form.
pub const ACCOUNT_FORM: &str = "/api/forms/accounts";
/// The HTMX route for deleting an account from the accounts page.
pub const DELETE_ACCOUNT_FORM: &str = "/api/forms/accounts/{account_id}";
/// The HTMX route for the create transaction form.
pub const TRANSACTION_FORM: &str = "/api/forms/transactions";
/// The HTMX route for deleting a transaction from the transactions page.
pub const DELETE_TRANSACTION_FORM: &str = "/api/forms/transactions/{transaction_id}";
/// The HTMX route for the create goal form.
pub const GOAL_FORM: &str = "/api/forms/goals";
/// The HTMX route for deleting a goal from the goals page.
pub const DELETE_GOAL_FORM: &str = "/api/forms/goals/{goal_id}";
/// The HTMX route for the budget category form.
pub const CATEGORY_FORM: &str = "/api/forms/categories";
/// The HTMX route for deleting a budget category from the categories page.
pub const DELETE_CATEGORY_FORM: &str = "/api/forms/categories/{category_id}";
/// The HTMX route for editing the user's name.
pub const PROFILE_FORM: &str = "/api/forms/profile";

/// The admin panel.
pub const ADMIN_VIEW: &str = "/admin";
/// The route for running read-only SQL queries.
pub const ADMIN_SQL_API: &str = "/admin/api/sql";
/// The route for blocking users.
pub const ADMIN_BLOCK_USERS_API: &str = "/admin/api/users/block";
/// The route for unblocking users.
pub const ADMIN_UNBLOCK_USERS_API: &str = "/admin/api/users/unblock";
/// The route for resetting failed log-in attempts.
pub const ADMIN_RESET_ATTEMPTS_API: &str = "/admin/api/users/reset_attempts";
/// The HTMX route for the SQL console on the admin page.
pub const ADMIN_SQL_FORM: &str = "/admin/forms/sql";
/// The HTMX route for the block button in the admin user table.
pub const ADMIN_BLOCK_USER_FORM: &str = "/admin/forms/users/{user_id}/block";
/// The HTMX route for the unblock button in the admin user table.
pub const ADMIN_UNBLOCK_USER_FORM: &str = "/admin/forms/users/{user_id}/unblock";
/// The HTMX route for the reset attempts button in the admin user table.
pub const ADMIN_RESET_ATTEMPTS_FORM: &str = "/admin/forms/users/{user_id}/reset_attempts";
/// The route for downloading an SQL dump of the whole database.
pub const ADMIN_BACKUP: &str = "/admin/backup";
/// The route for downloading an SQL dump of one user's rows.
pub const ADMIN_USER_BACKUP: &str = "/admin/backup/{user_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
