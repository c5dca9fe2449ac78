//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{
        create_account_endpoint, create_account_form_endpoint, delete_account_endpoint,
        delete_account_form_endpoint, get_accounts_page, list_accounts, update_account_endpoint,
    },
    admin::{
        block_user_form_endpoint, block_users_endpoint, full_backup_endpoint, get_admin_page,
        reset_attempts_endpoint, reset_attempts_form_endpoint, sql_console_form_endpoint,
        sql_query_endpoint, unblock_user_form_endpoint, unblock_users_endpoint,
        user_backup_endpoint,
    },
    auth::{
        auth_guard, auth_guard_hx, auth_guard_json, get_account_locked_page, get_log_in_page,
        get_log_out, get_profile_page, get_register_page, post_log_in, register_user,
        superuser_guard, superuser_guard_page, update_profile_form_endpoint,
    },
    budget_category::{
        delete_category_endpoint, delete_category_form_endpoint, get_categories_page,
        list_categories, save_category_endpoint, save_category_form_endpoint,
    },
    dashboard::get_dashboard_page,
    data_transfer::{export_data_endpoint, import_data_endpoint},
    endpoints,
    error_page::{get_404_not_found, get_internal_server_error_page},
    goal::{
        create_goal_form_endpoint, delete_goal_endpoint, delete_goal_form_endpoint,
        get_goals_page, list_goals, save_goal_endpoint,
    },
    transaction::{
        create_transaction_endpoint, create_transaction_form_endpoint,
        delete_transaction_endpoint, delete_transaction_form_endpoint, get_transactions_page,
        list_transactions, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::ACCOUNT_LOCKED_VIEW, get(get_account_locked_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::GOALS_VIEW, get(get_goals_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by HTMX and need the HX-REDIRECT header for auth redirects to work.
    let form_routes = Router::new()
        .route(endpoints::ACCOUNT_FORM, post(create_account_form_endpoint))
        .route(
            endpoints::DELETE_ACCOUNT_FORM,
            delete(delete_account_form_endpoint),
        )
        .route(
            endpoints::TRANSACTION_FORM,
            post(create_transaction_form_endpoint),
        )
        .route(
            endpoints::DELETE_TRANSACTION_FORM,
            delete(delete_transaction_form_endpoint),
        )
        .route(endpoints::GOAL_FORM, post(create_goal_form_endpoint))
        .route(endpoints::DELETE_GOAL_FORM, delete(delete_goal_form_endpoint))
        .route(endpoints::CATEGORY_FORM, post(save_category_form_endpoint))
        .route(
            endpoints::DELETE_CATEGORY_FORM,
            delete(delete_category_form_endpoint),
        )
        .route(endpoints::PROFILE_FORM, post(update_profile_form_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let api_routes = Router::new()
        .route(
            endpoints::ACCOUNTS_API,
            get(list_accounts).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT_API,
            put(update_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_API,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::GOALS_API, get(list_goals))
        .route(endpoints::SAVE_GOAL_API, post(save_goal_endpoint))
        .route(endpoints::DELETE_GOAL_API, post(delete_goal_endpoint))
        .route(endpoints::CATEGORIES_API, get(list_categories))
        .route(endpoints::SAVE_CATEGORY_API, post(save_category_endpoint))
        .route(endpoints::DELETE_CATEGORY_API, post(delete_category_endpoint))
        .route(endpoints::EXPORT_API, get(export_data_endpoint))
        .route(endpoints::IMPORT_API, post(import_data_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_json));

    let protected_routes = page_routes
        .merge(form_routes)
        .merge(api_routes)
        .merge(admin_routes(&state));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The admin routes, only reachable by superusers.
///
/// The superuser guards read the user ID set by the auth guards, so the auth
/// guard must be the outer layer.
fn admin_routes(state: &AppState) -> Router<AppState> {
    let pages = Router::new()
        .route(endpoints::ADMIN_VIEW, get(get_admin_page))
        .route(endpoints::ADMIN_BACKUP, get(full_backup_endpoint))
        .route(endpoints::ADMIN_USER_BACKUP, get(user_backup_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            superuser_guard_page,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let forms = Router::new()
        .route(endpoints::ADMIN_SQL_FORM, post(sql_console_form_endpoint))
        .route(
            endpoints::ADMIN_BLOCK_USER_FORM,
            post(block_user_form_endpoint),
        )
        .route(
            endpoints::ADMIN_UNBLOCK_USER_FORM,
            post(unblock_user_form_endpoint),
        )
        .route(
            endpoints::ADMIN_RESET_ATTEMPTS_FORM,
            post(reset_attempts_form_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), superuser_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let api = Router::new()
        .route(endpoints::ADMIN_SQL_API, post(sql_query_endpoint))
        .route(endpoints::ADMIN_BLOCK_USERS_API, post(block_users_endpoint))
        .route(
            endpoints::ADMIN_UNBLOCK_USERS_API,
            post(unblock_users_endpoint),
        )
        .route(
            endpoints::ADMIN_RESET_ATTEMPTS_API,
            post(reset_attempts_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), superuser_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_json));

    pages.merge(forms).merge(api)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
