//! The transactions page, with the HTMX endpoints for creating and deleting transactions.

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
use serde::{Deserialize, Deserializer};
use time::Date;

use crate::{
    AppState, Error,
    account::{Account, AccountId, get_accounts},
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_button,
        format_currency, submit_button,
    },
    navigation::NavBar,
    timezone::local_today,
    transaction::core::{
        Category, Transaction, TransactionBuilder, TransactionData, TransactionId,
        TransactionType, create_transaction, delete_transaction, get_transactions,
    },
    validation::parse_date,
};

/// The state needed for the transactions page and its form endpoints.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (transactions, accounts) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_transactions(user_id, None, &connection)?,
            get_accounts(user_id, &connection)?,
        )
    };
    let today = local_today(&state.local_timezone);

    Ok(transactions_view(&transactions, &accounts, today).into_response())
}

fn transactions_view(transactions: &[Transaction], accounts: &[Account], today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let table_row = |transaction: &Transaction| {
        let delete_url = format_endpoint(endpoints::DELETE_TRANSACTION_FORM, transaction.id);
        let (amount_style, sign) = match transaction.transaction_type {
            TransactionType::Income => ("px-6 py-4 text-right tabular-nums text-green-600", "+"),
            TransactionType::Expense => ("px-6 py-4 text-right tabular-nums", "-"),
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    time datetime=(transaction.date) { (transaction.date) }
                }

                th
                    scope="row"
                    class="px-6 py-4 font-medium text-gray-900 dark:text-white"
                {
                    (transaction.name)
                }

                td class=(TABLE_CELL_STYLE)
                {
                    span class=(BADGE_STYLE)
                    {
                        (transaction.category.emoji()) " " (transaction.category.label())
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (transaction.account.as_deref().unwrap_or("-"))
                }

                td class=(amount_style)
                {
                    (sign) (format_currency(transaction.amount))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (delete_button(
                        &delete_url,
                        &format!(
                            "Are you sure you want to delete the transaction '{}'? This cannot be undone.",
                            transaction.name
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
                h1 class="text-xl font-bold" { "Transactions" }

                div class=(CARD_STYLE)
                {
                    (create_transaction_form(accounts, today))
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Account" }
                                th scope="col" class="px-6 py-3 text-right" { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                (table_row(transaction))
                            }

                            @if transactions.is_empty() {
                                tr
                                {
                                    td
                                        colspan="6"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions yet. Add one with the form above."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Transactions", &content)
}

fn create_transaction_form(accounts: &[Account], today: Date) -> Markup {
    html!(
        form
            hx-post=(endpoints::TRANSACTION_FORM)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                input
                    type="text"
                    name="name"
                    id="name"
                    maxlength=(TransactionBuilder::MAX_NAME_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                input
                    type="number"
                    name="amount"
                    id="amount"
                    min="0.01"
                    step="0.01"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }
                input
                    type="date"
                    name="date"
                    id="date"
                    value=(today)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="transaction_type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="transaction_type" id="transaction_type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for transaction_type in TransactionType::ALL {
                        option
                            value=(transaction_type.as_str())
                            selected[transaction_type == TransactionType::Expense]
                        {
                            (transaction_type.label())
                        }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in Category::ALL {
                        option
                            value=(category.as_str())
                            selected[category == Category::default()]
                        {
                            (category.emoji()) " " (category.label())
                        }
                    }
                }
            }

            div
            {
                label for="account_id" class=(FORM_LABEL_STYLE) { "Account" }
                select name="account_id" id="account_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "No account" }

                    @for account in accounts {
                        option value=(account.id) { (account.name) }
                    }
                }
            }

            div class="md:col-span-3"
            {
                (submit_button("Add transaction"))
            }
        }
    )
}

/// The form data for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    pub name: String,
    pub amount: f64,
    pub transaction_type: String,
    pub category: String,
    pub date: String,
    /// The empty string means no account.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub account_id: Option<AccountId>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<AccountId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl TransactionForm {
    fn validate(&self) -> Result<TransactionData, Error> {
        Transaction::build(
            &self.name,
            self.amount,
            self.transaction_type.parse()?,
            parse_date(&self.date)?,
        )
        .category(self.category.parse()?)
        .account_id(self.account_id)
        .finalise()
    }
}

/// A route handler for creating a transaction, redirects to the transactions page on success.
pub async fn create_transaction_form_endpoint(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let data = match form.validate() {
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

    if let Err(error) = create_transaction(user_id, &data, &connection) {
        tracing::error!("Could not create transaction with {form:?}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for deleting a transaction, responds with an alert.
pub async fn delete_transaction_form_endpoint(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_transaction(user_id, transaction_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Transaction deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}
