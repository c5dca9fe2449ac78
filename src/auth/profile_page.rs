//! The profile page: the user's name, data export/import and a link to the admin panel.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{FullName, User, UserID, UserProfile, get_profile, get_user_by_id, update_profile_names},
    data_transfer::JSON_FILE_FIELD,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, base, submit_button,
    },
    navigation::NavBar,
};

/// The state needed for the profile page and the name form.
#[derive(Debug, Clone)]
pub struct ProfilePageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfilePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_profile_page(
    State(state): State<ProfilePageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (user, profile) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_user_by_id(user_id, &connection)?,
            get_profile(user_id, &connection)?,
        )
    };

    Ok(profile_view(&user, &profile).into_response())
}

fn profile_view(user: &User, profile: &UserProfile) -> Markup {
    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW).into_html();
    let full_name = profile.full_name();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                header
                {
                    h1 class="text-xl font-bold" { (user.username) }

                    @if !full_name.is_empty() {
                        p id="full-name" class="text-gray-600 dark:text-gray-400" { (full_name) }
                    }
                }

                div class=(CARD_STYLE)
                {
                    h2 class="text-lg font-semibold mb-4" { "Name" }
                    (name_form(profile))
                }

                div class=(CARD_STYLE)
                {
                    h2 class="text-lg font-semibold mb-4" { "Your data" }

                    p class="mb-4"
                    {
                        a href=(endpoints::EXPORT_API) class=(LINK_STYLE) download
                        {
                            "Download all your data as JSON"
                        }
                    }

                    (import_form())
                }

                @if user.is_superuser {
                    p
                    {
                        a href=(endpoints::ADMIN_VIEW) class=(LINK_STYLE) { "Open the admin panel" }
                    }
                }
            }
        }
    );

    base("Profile", &content)
}

fn name_input(name: &str, label: &str, value: &str, required: bool) -> Markup {
    html!(
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input
                type="text"
                name=(name)
                id=(name)
                value=(value)
                required[required]
                class=(FORM_TEXT_INPUT_STYLE);
        }
    )
}

fn name_form(profile: &UserProfile) -> Markup {
    html!(
        form
            hx-post=(endpoints::PROFILE_FORM)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            (name_input("last_name", "Last name", &profile.last_name, true))
            (name_input("first_name", "First name", &profile.first_name, true))
            (name_input("patronymic", "Patronymic", &profile.patronymic, false))

            div class="md:col-span-3"
            {
                (submit_button("Save name"))
            }
        }
    )
}

fn import_form() -> Markup {
    html!(
        form
            id="import-form"
            hx-post=(endpoints::IMPORT_API)
            hx-encoding="multipart/form-data"
            hx-target="#alert-container"
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            class="flex flex-wrap gap-4 items-end"
        {
            div
            {
                label for=(JSON_FILE_FIELD) class=(FORM_LABEL_STYLE) { "Import a JSON export" }
                input
                    type="file"
                    name=(JSON_FILE_FIELD)
                    id=(JSON_FILE_FIELD)
                    accept="application/json,.json"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class={ "max-w-xs " (BUTTON_PRIMARY_STYLE) } { "Import" }
        }
    )
}

/// The form data for changing the user's name.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub patronymic: String,
}

/// A route handler for updating the user's name, redirects to the profile page on success.
pub async fn update_profile_form_endpoint(
    State(state): State<ProfilePageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let name = match FullName::new(&form.first_name, &form.last_name, Some(&form.patronymic)) {
        Ok(name) => name,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = update_profile_names(user_id, &name, &connection) {
        tracing::error!("Could not update the name of user {user_id}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::PROFILE_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};
    use scraper::Selector;

    use crate::{
        auth::{FullName, PasswordHash, Role, Username, create_user, get_profile},
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            get_test_connection, must_create_user, must_get_form, parse_html_document,
        },
    };

    use super::{ProfileForm, ProfilePageState, get_profile_page, update_profile_form_endpoint};

    #[tokio::test]
    async fn page_shows_name_form_and_data_links() {
        let connection = get_test_connection();
        let user = create_user(
            Username::new("ivan").unwrap(),
            PasswordHash::new_unchecked("hash"),
            Some(&FullName::new("Ivan", "Petrov", Some("Sergeevich")).unwrap()),
            Role::Regular,
            &connection,
        )
        .unwrap();
        let state = ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_profile_page(State(state), Extension(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let full_name: String = html
            .select(&Selector::parse("#full-name").unwrap())
            .next()
            .expect("No full name shown")
            .text()
            .collect();
        assert_eq!(full_name, "Petrov Ivan Sergeevich");

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::PROFILE_FORM, "hx-post");
        assert_form_input(&form, "first_name", "text");
        assert_form_input(&form, "last_name", "text");

        let import_form = html
            .select(&Selector::parse("#import-form").unwrap())
            .next()
            .expect("No import form");
        assert_hx_endpoint(&import_form, endpoints::IMPORT_API, "hx-post");
        assert_form_input(&import_form, "json_file", "file");

        let links: Vec<&str> = html
            .select(&Selector::parse("main a[href]").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert!(links.contains(&endpoints::EXPORT_API));
        assert!(!links.contains(&endpoints::ADMIN_VIEW));
    }

    #[tokio::test]
    async fn superusers_see_admin_link() {
        let connection = get_test_connection();
        let admin = create_user(
            Username::new("admin").unwrap(),
            PasswordHash::new_unchecked("hash"),
            None,
            Role::Superuser,
            &connection,
        )
        .unwrap();
        let state = ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_profile_page(State(state), Extension(admin.id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let has_admin_link = html
            .select(&Selector::parse("main a[href]").unwrap())
            .any(|link| link.value().attr("href") == Some(endpoints::ADMIN_VIEW));
        assert!(has_admin_link);
    }

    #[tokio::test]
    async fn name_form_updates_profile() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = ProfileForm {
            first_name: "Anna".to_owned(),
            last_name: "Ivanova".to_owned(),
            patronymic: String::new(),
        };

        let response =
            update_profile_form_endpoint(State(state.clone()), Extension(user_id), Form(form))
                .await;

        assert_hx_redirect(&response, endpoints::PROFILE_VIEW);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_profile(user_id, &connection).unwrap().full_name(), "Ivanova Anna");
    }

    #[tokio::test]
    async fn name_form_rejects_invalid_names() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = ProfileForm {
            first_name: "Anna".to_owned(),
            last_name: "Ivanova2".to_owned(),
            patronymic: String::new(),
        };

        let response =
            update_profile_form_endpoint(State(state), Extension(user_id), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
