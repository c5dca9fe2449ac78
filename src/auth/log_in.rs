//! The log-in page and the form handler that checks credentials and applies the lockout rules.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{
        LogInOutcome, User, invalidate_auth_cookie, lockout::record_log_in_attempt,
        normalize_redirect_url, set_auth_cookie, user::get_user_by_username,
    },
    endpoints,
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    timezone::get_local_offset,
};

fn log_in_form(
    username: &str,
    username_error: Option<&str>,
    password_error: Option<&str>,
    redirect_url: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("username", "Username", username, true, username_error))
            (password_input("password", "Password", 0, password_error))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            (submit_button("Log in"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &content).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The parts of [AppState] needed to log a user in.
#[derive(Debug, Clone)]
pub struct LoginState {
    pub cookie_key: Key,
    pub cookie_duration: Duration,
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

pub const USER_NOT_FOUND_ERROR_MSG: &str = "User not found.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn incorrect_password_message(attempts_remaining: u8) -> String {
    format!("Incorrect password. {attempts_remaining} attempt(s) remaining.")
}

/// The URL of the page telling `username` that their account is locked.
pub fn account_locked_url(username: &str) -> String {
    match serde_urlencoded::to_string([("username", username)]) {
        Ok(query) => format!("{}?{query}", endpoints::ACCOUNT_LOCKED_VIEW),
        Err(error) => {
            tracing::error!("Could not encode username {username}: {error}");
            endpoints::ACCOUNT_LOCKED_VIEW.to_owned()
        }
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the client is
/// redirected to the dashboard page, or the page they originally requested.
/// Blocked users, and users that just used up their last attempt, are
/// redirected to the account locked page. Otherwise, the form is returned with
/// an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();
    let internal_error =
        || log_in_form(username, None, Some(INTERNAL_ERROR_MSG), redirect_url).into_response();

    let user: User = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return internal_error();
            }
        };

        match get_user_by_username(username, &connection) {
            Ok(user) => user,
            Err(Error::UserNotFound) => {
                return log_in_form(username, Some(USER_NOT_FOUND_ERROR_MSG), None, redirect_url)
                    .into_response();
            }
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return internal_error();
            }
        }
    };

    let is_password_valid = match user.password_hash.verify(&user_data.password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return internal_error();
        }
    };

    let outcome = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return internal_error();
            }
        };

        match record_log_in_attempt(
            user.id,
            is_password_valid,
            OffsetDateTime::now_utc(),
            &connection,
        ) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!("Could not record log-in attempt for user {}: {error}", user.id);
                return internal_error();
            }
        }
    };

    match outcome {
        LogInOutcome::Authenticated => {}
        LogInOutcome::Blocked => {
            return (
                HxRedirect(account_locked_url(user.username.as_ref())),
                StatusCode::SEE_OTHER,
            )
                .into_response();
        }
        LogInOutcome::Rejected { attempts_remaining } => {
            return log_in_form(
                username,
                None,
                Some(&incorrect_password_message(attempts_remaining)),
                redirect_url,
            )
            .into_response();
        }
    }

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let local_timezone = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    tracing::info!("User {} logged in", user.id);

    set_auth_cookie(jar.clone(), user.id, cookie_duration, local_timezone)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The log-in form as submitted.
///
/// The password is only compared against the stored hash, so it is not validated.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub username: String,
    pub password: String,

    /// Checked boxes are sent with any value and unchecked ones are omitted,
    /// so `Some` means "remember me".
    pub remember_me: Option<String>,

    /// The page to return to, checked with [normalize_redirect_url].
    pub redirect_url: Option<String>,
}
