//! The goals page, with the HTMX endpoints for creating and deleting goals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, AccountId, get_accounts},
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    goal::{
        core::{Goal, GoalData, GoalId, delete_goal, save_goal},
        progress::{GoalProgress, get_goals_with_progress},
    },
    html::{
        CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_button,
        format_currency, progress_bar, submit_button,
    },
    navigation::NavBar,
};

/// The state needed for the goals page and its form endpoints.
#[derive(Debug, Clone)]
pub struct GoalsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

pub async fn get_goals_page(
    State(state): State<GoalsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (goals, accounts) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        (
            get_goals_with_progress(user_id, &connection)?,
            get_accounts(user_id, &connection)?,
        )
    };

    Ok(goals_view(&goals, &accounts).into_response())
}

fn goals_view(goals: &[(Goal, GoalProgress)], accounts: &[Account]) -> Markup {
    let nav_bar = NavBar::new(endpoints::GOALS_VIEW).into_html();

    let linked_account_names = |goal: &Goal| -> String {
        accounts
            .iter()
            .filter(|account| goal.linked_account_ids.contains(&account.id))
            .map(|account| account.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let table_row = |(goal, progress): &(Goal, GoalProgress)| {
        let delete_url = format_endpoint(endpoints::DELETE_GOAL_FORM, goal.id);
        let linked_accounts = linked_account_names(goal);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                th
                    scope="row"
                    class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    (goal.name)

                    @if !linked_accounts.is_empty() {
                        p class="text-xs font-normal text-gray-500 dark:text-gray-400"
                        {
                            @if goal.use_only_linked_accounts {
                                "Only: "
                            } @else {
                                "Plus: "
                            }
                            (linked_accounts)
                        }
                    }
                }

                td class="px-6 py-4 min-w-48"
                {
                    div class="flex justify-between text-xs mb-1"
                    {
                        span { (format_currency(progress.calculated_amount)) }
                        span { (progress.progress_percent) "%" }
                    }
                    (progress_bar(progress.progress_percent, "bg-blue-600"))
                }

                td class="px-6 py-4 text-right tabular-nums"
                {
                    (format_currency(goal.target_amount))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (delete_button(
                        &delete_url,
                        &format!("Are you sure you want to delete the goal '{}'?", goal.name),
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
                h1 class="text-xl font-bold" { "Goals" }

                div class=(CARD_STYLE)
                {
                    (create_goal_form(accounts))
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Goal" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Progress" }
                                th scope="col" class="px-6 py-3 text-right" { "Target" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for goal in goals {
                                (table_row(goal))
                            }

                            @if goals.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No goals yet. Add one with the form above."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Goals", &content)
}

fn create_goal_form(accounts: &[Account]) -> Markup {
    html!(
        form
            hx-post=(endpoints::GOAL_FORM)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-2 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                input
                    type="text"
                    name="name"
                    id="name"
                    maxlength=(GoalData::MAX_NAME_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="target_amount" class=(FORM_LABEL_STYLE) { "Target" }
                input
                    type="number"
                    name="target_amount"
                    id="target_amount"
                    min="0.01"
                    step="0.01"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !accounts.is_empty() {
                fieldset class="md:col-span-2"
                {
                    legend class=(FORM_LABEL_STYLE) { "Linked accounts" }

                    div class="flex flex-wrap gap-4"
                    {
                        @for account in accounts {
                            label class="inline-flex items-center gap-2 text-sm"
                            {
                                input type="checkbox" name="accounts" value=(account.id);
                                (account.name)
                            }
                        }
                    }

                    label class="inline-flex items-center gap-2 mt-2 text-sm"
                    {
                        input type="checkbox" name="use_only_accounts" value="true";
                        "Only count the linked accounts"
                    }
                }
            }

            div class="md:col-span-2"
            {
                (submit_button("Add goal"))
            }
        }
    )
}

/// The form data for creating a goal.
///
/// The linked accounts come from repeated `accounts` fields.
#[derive(Debug, Deserialize)]
pub struct GoalForm {
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub use_only_accounts: bool,
    #[serde(default)]
    pub accounts: Vec<AccountId>,
}

/// A route handler for creating a new goal, redirects to the goals page on success.
pub async fn create_goal_form_endpoint(
    State(state): State<GoalsPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<GoalForm>,
) -> Response {
    let data = match GoalData::new(
        &form.name,
        form.target_amount,
        None,
        form.use_only_accounts,
        form.accounts.clone(),
    ) {
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

    if let Err(error) = save_goal(user_id, None, &data, &connection) {
        tracing::error!("Could not create goal with {form:?}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::GOALS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for deleting a goal, responds with an alert.
pub async fn delete_goal_form_endpoint(
    State(state): State<GoalsPageState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_goal(user_id, goal_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Goal deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete goal {goal_id}: {error}");
            error.into_alert_response()
        }
    }
}
