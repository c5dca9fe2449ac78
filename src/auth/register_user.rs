//! The registration page for creating an account.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{FullName, PasswordHash, Role, Username, ValidatedPassword, create_user, set_auth_cookie},
    endpoints,
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    timezone::get_local_offset,
};

/// The error messages shown under each field of the registration form.
#[derive(Debug, Default)]
struct RegistrationErrors {
    username: Option<String>,
    name: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
    form: Option<String>,
}

fn registration_form(user_data: &RegisterForm, errors: &RegistrationErrors) -> Markup {
    let min_length = ValidatedPassword::MIN_LENGTH;

    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", &user_data.username, true, errors.username.as_deref()))
            (text_input("last_name", "Last name", &user_data.last_name, true, None))
            (text_input("first_name", "First name", &user_data.first_name, true, None))
            (text_input("patronymic", "Patronymic (optional)", &user_data.patronymic, false, errors.name.as_deref()))
            (password_input("password", "Password", min_length, errors.password.as_deref()))
            (password_input("confirm_password", "Confirm password", min_length, errors.confirm_password.as_deref()))

            @if let Some(error_message) = &errors.form {
                p class="text-red-500 text-base" { (error_message) }
            }

            (submit_button("Create account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form =
        registration_form(&RegisterForm::default(), &RegistrationErrors::default());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &content).into_response()
}

/// Registration logs the new user in, so it needs the cookie settings as well as the database.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub cookie_key: Key,
    pub cookie_duration: Duration,
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub patronymic: String,
    pub password: String,
    pub confirm_password: String,
}

/// The checked fields of a registration form.
struct NewUser {
    username: Username,
    name: FullName,
    password: ValidatedPassword,
}

fn validate_registration(user_data: &RegisterForm) -> Result<NewUser, RegistrationErrors> {
    let mut errors = RegistrationErrors::default();

    let username = Username::new(&user_data.username)
        .inspect_err(|error| errors.username = Some(error.to_string()))
        .ok();
    let name = FullName::new(
        &user_data.first_name,
        &user_data.last_name,
        Some(&user_data.patronymic),
    )
    .inspect_err(|error| errors.name = Some(error.to_string()))
    .ok();
    let password = ValidatedPassword::new(&user_data.password)
        .inspect_err(|error| errors.password = Some(error.to_string()))
        .ok();

    if user_data.password != user_data.confirm_password {
        errors.confirm_password = Some(Error::PasswordsDoNotMatch.to_string());
    }

    match (username, name, password, &errors.confirm_password) {
        (Some(username), Some(name), Some(password), None) => Ok(NewUser {
            username,
            name,
            password,
        }),
        _ => Err(errors),
    }
}

/// Create a user and their profile from the registration form, then log them in.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let form_error = |message: &str| {
        let errors = RegistrationErrors {
            form: Some(message.to_owned()),
            ..Default::default()
        };
        registration_form(&user_data, &errors).into_response()
    };

    let new_user = match validate_registration(&user_data) {
        Ok(new_user) => new_user,
        Err(errors) => return registration_form(&user_data, &errors).into_response(),
    };

    let local_timezone = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let password_hash = match PasswordHash::new(new_user.password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return form_error("An internal error occurred. Please try again later.");
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return form_error("An internal error occurred. Please try again later.");
            }
        };

        match create_user(
            new_user.username,
            password_hash,
            Some(&new_user.name),
            Role::Regular,
            &connection,
        ) {
            Ok(user) => user,
            Err(error @ Error::DuplicateUsername(_)) => {
                let errors = RegistrationErrors {
                    username: Some(error.to_string()),
                    ..Default::default()
                };
                return registration_form(&user_data, &errors).into_response();
            }
            Err(error) => {
                tracing::error!("An unhandled error occurred while inserting a new user: {error}");
                return form_error("An internal error occurred. Please try again later.");
            }
        }
    };

    tracing::info!("Registered user {} ({})", user.id, user.username);

    match set_auth_cookie(jar, user.id, state.cookie_duration, local_timezone) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::USERS, "hx-post");
        for name in ["username", "first_name", "last_name"] {
            assert_form_input(&form, name, "text");
        }
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        app_state::create_cookie_key,
        auth::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, get_profile, get_user_by_username},
        endpoints,
        test_utils::{get_test_connection, must_create_user},
    };

    use super::RegistrationState;

    fn get_test_server(connection: Connection) -> (TestServer, Arc<Mutex<Connection>>) {
        let db_connection = Arc::new(Mutex::new(connection));
        let state = RegistrationState {
            cookie_key: create_cookie_key("foobar"),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: db_connection.clone(),
        };
        let app = Router::new()
            .route(endpoints::USERS, post(super::register_user))
            .with_state(state);

        (
            TestServer::new(app),
            db_connection,
        )
    }

    #[tokio::test]
    async fn registers_user_with_profile_and_logs_in() {
        let (server, db_connection) = get_test_server(get_test_connection());

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("username", "ivan"),
                ("first_name", "Иван"),
                ("last_name", "Petrov"),
                ("patronymic", ""),
                ("password", "secret1"),
                ("confirm_password", "secret1"),
            ])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_some());

        let connection = db_connection.lock().unwrap();
        let user = get_user_by_username("ivan", &connection).unwrap();
        assert!(!user.is_superuser);
        assert_eq!(get_profile(user.id, &connection).unwrap().full_name(), "Petrov Иван");
    }

    #[tokio::test]
    async fn mismatched_passwords_are_reported() {
        let (server, _) = get_test_server(get_test_connection());

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("username", "ivan"),
                ("first_name", "Ivan"),
                ("last_name", "Petrov"),
                ("password", "secret1"),
                ("confirm_password", "secret2"),
            ])
            .await;

        response.assert_status_ok();
        response.assert_text_contains("passwords do not match");
    }

    #[tokio::test]
    async fn short_password_and_bad_names_are_reported() {
        let (server, _) = get_test_server(get_test_connection());

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("username", "ivan"),
                ("first_name", "I"),
                ("last_name", "Petrov"),
                ("password", "abc"),
                ("confirm_password", "abc"),
            ])
            .await;

        response.assert_status_ok();
        response.assert_text_contains("password must be at least 6 characters long");
        response.assert_text_contains("First name must contain at least 2 characters");
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let connection = get_test_connection();
        must_create_user("ivan", &connection);
        let (server, _) = get_test_server(connection);

        let response = server
            .post(endpoints::USERS)
            .form(&[
                ("username", "ivan"),
                ("first_name", "Ivan"),
                ("last_name", "Petrov"),
                ("password", "secret1"),
                ("confirm_password", "secret1"),
            ])
            .await;

        response.assert_status_ok();
        response.assert_text_contains("the username &quot;ivan&quot; is already taken");
    }
}
