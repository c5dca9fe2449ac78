//! The accounts page, with the HTMX endpoints for creating and deleting accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{
        Account, AccountData, AccountId, AccountType, create_account, delete_account,
        get_accounts,
    },
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_button,
        format_currency, submit_button,
    },
    navigation::NavBar,
};

/// The state needed for the accounts page and its form endpoints.
#[derive(Debug, Clone)]
pub struct AccountsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_accounts_page(
    State(state): State<AccountsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let accounts = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_accounts(user_id, &connection)?
    };

    Ok(accounts_view(&accounts).into_response())
}

fn accounts_view(accounts: &[Account]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ACCOUNTS_VIEW).into_html();
    let total: f64 = accounts.iter().map(|account| account.amount).sum();

    let table_row = |account: &Account| {
        let delete_url = format_endpoint(endpoints::DELETE_ACCOUNT_FORM, account.id);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                th
                    scope="row"
                    class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    (account.name)

                    @if !account.description.is_empty() {
                        p class="text-xs font-normal text-gray-500 dark:text-gray-400"
                        {
                            (account.description)
                        }
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    span class=(BADGE_STYLE) { (account.account_type.label()) }
                }

                td class="px-6 py-4 text-right tabular-nums"
                {
                    (format_currency(account.amount))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (delete_button(
                        &delete_url,
                        &format!(
                            "Are you sure you want to delete the account '{}'? \
                            Its transactions will be kept without an account.",
                            account.name
                        ),
                    ))
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Accounts" }

                    p class="text-sm"
                    {
                        "Total: " (format_currency(total))
                    }
                }

                div class=(CARD_STYLE)
                {
                    (create_account_form())
                }

                div class="w-full overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class="px-6 py-3 text-right" { "Balance" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for account in accounts {
                                (table_row(account))
                            }

                            @if accounts.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No accounts yet. Add one with the form above."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Accounts", &content)
}

fn create_account_form() -> Markup {
    html!(
        form
            hx-post=(endpoints::ACCOUNT_FORM)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-4 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                input
                    type="text"
                    name="name"
                    id="name"
                    maxlength=(AccountData::MAX_NAME_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Balance" }
                input
                    type="number"
                    name="amount"
                    id="amount"
                    min="0"
                    step="0.01"
                    value="0"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="account_type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="account_type" id="account_type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for account_type in AccountType::ALL {
                        option
                            value=(account_type.as_str())
                            selected[account_type == AccountType::default()]
                        {
                            (account_type.label())
                        }
                    }
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                input
                    type="text"
                    name="description"
                    id="description"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="md:col-span-4"
            {
                (submit_button("Add account"))
            }
        }
    )
}

/// The form data for creating an account.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub amount: f64,
    pub account_type: String,
    #[serde(default)]
    pub description: String,
}

/// A route handler for creating a new account, redirects to the accounts page on success.
pub async fn create_account_form_endpoint(
    State(state): State<AccountsPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<AccountForm>,
) -> Response {
    let data = match form
        .account_type
        .parse()
        .and_then(|account_type| {
            AccountData::new(&form.name, form.amount, account_type, &form.description)
        }) {
        Ok(data) => data,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = create_account(user_id, &data, &connection) {
        tracing::error!("Could not create account with {form:?}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::ACCOUNTS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for deleting an account, responds with an alert.
pub async fn delete_account_form_endpoint(
    State(state): State<AccountsPageState>,
    Extension(user_id): Extension<UserID>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_account(user_id, account_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Account deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use scraper::Selector;

    use crate::{
        account::core::{AccountData, AccountType, create_account, get_accounts},
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, get_test_connection, must_create_user, must_get_form,
            parse_html_document,
        },
    };

    use super::{
        AccountForm, AccountsPageState, create_account_form_endpoint,
        delete_account_form_endpoint, get_accounts_page,
    };

    #[tokio::test]
    async fn page_lists_accounts_with_form() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        create_account(
            user_id,
            &AccountData::new("Sberbank card", 1234.0, AccountType::Debit, "").unwrap(),
            &connection,
        )
        .unwrap();
        let state = AccountsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_accounts_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::ACCOUNT_FORM, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_input(&form, "amount", "number");
        assert_form_submit_button(&form);

        let rows: Vec<String> = html
            .select(&Selector::parse("tbody tr").unwrap())
            .map(|row| row.text().collect())
            .collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("Sberbank card"));
        assert!(rows[0].contains("1,234₽"));
        assert!(rows[0].contains("Debit card"));
    }

    #[tokio::test]
    async fn create_form_redirects_to_accounts_page() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = AccountsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = AccountForm {
            name: "Cash".to_owned(),
            amount: 500.0,
            account_type: "cash".to_owned(),
            description: String::new(),
        };

        let response =
            create_account_form_endpoint(State(state.clone()), Extension(user_id), Form(form))
                .await;

        assert_hx_redirect(&response, endpoints::ACCOUNTS_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let accounts = get_accounts(user_id, &connection).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_type, AccountType::Cash);
    }

    #[tokio::test]
    async fn create_form_rejects_negative_amount() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let state = AccountsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = AccountForm {
            name: "Cash".to_owned(),
            amount: -1.0,
            account_type: "cash".to_owned(),
            description: String::new(),
        };

        let response =
            create_account_form_endpoint(State(state), Extension(user_id), Form(form)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_responds_with_ok_alert() {
        let connection = get_test_connection();
        let user_id = must_create_user("ivan", &connection);
        let account = create_account(
            user_id,
            &AccountData::new("Cash", 1.0, AccountType::Cash, "").unwrap(),
            &connection,
        )
        .unwrap();
        let state = AccountsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response =
            delete_account_form_endpoint(State(state.clone()), Extension(user_id), Path(account.id))
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response =
            delete_account_form_endpoint(State(state), Extension(user_id), Path(account.id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
