//! The page shown to users that were blocked after too many failed log-in attempts.

use axum::{
    extract::Query,
    response::{IntoResponse, Response},
};
use maud::html;
use serde::Deserialize;

use crate::{
    auth::MAX_FAILED_LOG_IN_ATTEMPTS,
    endpoints,
    html::{base, link, log_in_register},
};

#[derive(Debug, Deserialize)]
pub struct AccountLockedQuery {
    pub username: Option<String>,
}

/// Display the account locked page.
///
/// The page is public so that it can be shown before the user has logged in.
pub async fn get_account_locked_page(Query(query): Query<AccountLockedQuery>) -> Response {
    let username = query
        .username
        .as_deref()
        .map(str::trim)
        .filter(|username| !username.is_empty());

    let content = html! {
        div class="space-y-4 text-gray-700 dark:text-gray-300"
        {
            p
            {
                @if let Some(username) = username {
                    "The account " strong { (username) } " has been locked"
                } @else {
                    "Your account has been locked"
                }
                " after " (MAX_FAILED_LOG_IN_ATTEMPTS) " failed log-in attempts."
            }

            p
            {
                "Locked accounts are not unlocked automatically. \
                Contact an administrator to unlock your account."
            }

            p class="text-sm" { (link(endpoints::LOG_IN_VIEW, "Back to the log-in page")) }
        }
    };

    let content = log_in_register("Account locked", &content);
    base("Account Locked", &content).into_response()
}
