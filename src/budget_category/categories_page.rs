//! The budget page, listing the monthly budget of each category and how much of it is spent.

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
    alert::Alert,
    auth::UserID,
    budget_category::{
        core::{BudgetCategoryData, BudgetCategoryId, delete_budget_category, save_budget_category},
        usage::{BudgetStatus, BudgetUsage, get_budget_usage},
    },
    endpoints::{self, format_endpoint},
    html::{
        CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, delete_button,
        format_currency, progress_bar, submit_button,
    },
    navigation::NavBar,
    timezone::local_today,
    transaction::Category,
};

#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone);
    let usage = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_budget_usage(user_id, today, &connection)?
    };

    Ok(categories_view(&usage).into_response())
}

/// The colour of the progress bar and status text for a budget.
pub fn status_style(status: &BudgetStatus) -> (&'static str, &'static str) {
    match status {
        BudgetStatus::NoBudget => ("bg-gray-400", "text-gray-500 dark:text-gray-400"),
        BudgetStatus::Good => ("bg-green-500", "text-green-600 dark:text-green-400"),
        BudgetStatus::Warning => ("bg-yellow-400", "text-yellow-600 dark:text-yellow-300"),
        BudgetStatus::OverBudget { .. } => ("bg-red-600", "text-red-600 dark:text-red-400"),
    }
}

/// The status line under a budget's progress bar.
pub fn budget_status_html(usage: &BudgetUsage) -> Markup {
    let (_, text_style) = status_style(&usage.status);

    html!(
        p class={ "text-xs " (text_style) }
        {
            (usage.status.label())

            @if let BudgetStatus::OverBudget { overspent } = usage.status {
                " by " (format_currency(overspent))
            }
        }
    )
}

fn categories_view(usage: &[BudgetUsage]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let table_row = |usage: &BudgetUsage| {
        let category = &usage.category;
        let delete_url = format_endpoint(endpoints::DELETE_CATEGORY_FORM, category.id);
        let (bar_style, _) = status_style(&usage.status);

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                th
                    scope="row"
                    class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    @if !category.emoji.is_empty() {
                        span class="mr-2" { (category.emoji) }
                    }
                    (category.name)
                }

                td class="px-6 py-4 text-right tabular-nums"
                {
                    (format_currency(usage.spent)) " / " (format_currency(category.budget))
                }

                td class="px-6 py-4 min-w-48"
                {
                    (progress_bar(usage.progress_percent, bar_style))
                    (budget_status_html(usage))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (delete_button(
                        &delete_url,
                        &format!(
                            "Are you sure you want to delete the budget for '{}'?",
                            category.name
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
                header
                {
                    h1 class="text-xl font-bold" { "Budget" }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Expenses this month, matched to a budget by category name."
                    }
                }

                div class=(CARD_STYLE)
                {
                    (category_form())
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class="px-6 py-3 text-right" { "Spent / Budget" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for item in usage {
                                (table_row(item))
                            }

                            @if usage.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                                    {
                                        "No budgets yet. Add one with the form above."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Budget", &content)
}

fn category_form() -> Markup {
    html!(
        form
            hx-post=(endpoints::CATEGORY_FORM)
            hx-target-error="#alert-container"
            class="grid gap-4 md:grid-cols-3 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Category" }
                input
                    type="text"
                    name="name"
                    id="name"
                    list="category-names"
                    maxlength=(BudgetCategoryData::MAX_NAME_LENGTH)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="category-names"
                {
                    @for category in Category::ALL {
                        option value=(category.label()) {}
                    }
                }
            }

            div
            {
                label for="budget" class=(FORM_LABEL_STYLE) { "Monthly budget" }
                input
                    type="number"
                    name="budget"
                    id="budget"
                    min="0"
                    step="0.01"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="emoji" class=(FORM_LABEL_STYLE) { "Emoji" }
                input
                    type="text"
                    name="emoji"
                    id="emoji"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="md:col-span-3"
            {
                (submit_button("Save budget"))
            }
        }
    )
}

/// The form data for saving a budget category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub budget: f64,
    #[serde(default)]
    pub emoji: String,
}

/// A route handler for creating or updating a budget category by name,
/// redirects to the budget page on success.
pub async fn save_category_form_endpoint(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let data = match BudgetCategoryData::new(&form.name, form.budget, &form.emoji) {
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

    if let Err(error) = save_budget_category(user_id, &data, &connection) {
        tracing::error!("Could not save budget category with {form:?}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

pub async fn delete_category_form_endpoint(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<BudgetCategoryId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_budget_category(user_id, category_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Budget deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not delete budget category {category_id}: {error}");
            error.into_alert_response()
        }
    }
}
