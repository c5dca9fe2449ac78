//! The admin panel page.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    Error,
    admin::{AdminState, sql_console::results_view},
    auth::{MAX_FAILED_LOG_IN_ATTEMPTS, User, UserProfile, count_users, get_all_users, get_profile},
    endpoints::{self, format_endpoint},
    html::{
        BADGE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base,
    },
    navigation::NavBar,
};

/// Row counts shown at the top of the admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub users: usize,
    pub accounts: usize,
    pub transactions: usize,
    pub goals: usize,
}

fn count_rows(table: &str, connection: &Connection) -> Result<usize, Error> {
    let count: i64 =
        connection.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })?;

    usize::try_from(count)
        .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count).into())
}

pub fn get_admin_stats(connection: &Connection) -> Result<AdminStats, Error> {
    Ok(AdminStats {
        users: count_users(connection)?,
        accounts: count_rows("account", connection)?,
        transactions: count_rows("transaction", connection)?,
        goals: count_rows("goal", connection)?,
    })
}

/// `GET /admin`
pub async fn get_admin_page(State(state): State<AdminState>) -> Result<Response, Error> {
    let (stats, users) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let users = get_all_users(&connection)?
            .into_iter()
            .map(|user| get_profile(user.id, &connection).map(|profile| (user, profile)))
            .collect::<Result<Vec<_>, _>>()?;

        (get_admin_stats(&connection)?, users)
    };

    Ok(admin_view(&stats, &users).into_response())
}

fn stat_card(label: &str, value: usize) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class="text-2xl font-bold" { (value) }
        }
    )
}

fn action_button(url: &str, text: &str) -> Markup {
    html!(
        button
            hx-post=(url)
            hx-target-error="#alert-container"
            class=(LINK_STYLE)
        {
            (text)
        }
    )
}

fn user_row(user: &User, profile: &UserProfile) -> Markup {
    let user_id = user.id.as_i64();

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            th
                scope="row"
                class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                (user.username)

                @if user.is_superuser {
                    " "
                    span class=(BADGE_STYLE) { "superuser" }
                }
            }

            td class=(TABLE_CELL_STYLE) { (profile.full_name()) }

            td class=(TABLE_CELL_STYLE)
            {
                (profile.failed_log_in_attempts) " / " (MAX_FAILED_LOG_IN_ATTEMPTS)
            }

            td class=(TABLE_CELL_STYLE)
            {
                @match profile.blocked_at {
                    Some(blocked_at) => {
                        span class="text-red-600 dark:text-red-400" { "Blocked" }
                        p class="text-xs" { (blocked_at.date()) }
                    },
                    None => { "Active" },
                }
            }

            td class="px-6 py-4 space-x-2 whitespace-nowrap"
            {
                @if profile.is_blocked() {
                    (action_button(&format_endpoint(endpoints::ADMIN_UNBLOCK_USER_FORM, user_id), "Unblock"))
                } @else if !user.is_superuser {
                    (action_button(&format_endpoint(endpoints::ADMIN_BLOCK_USER_FORM, user_id), "Block"))
                }

                @if profile.failed_log_in_attempts > 0 {
                    (action_button(&format_endpoint(endpoints::ADMIN_RESET_ATTEMPTS_FORM, user_id), "Reset attempts"))
                }

                a
                    href=(format_endpoint(endpoints::ADMIN_USER_BACKUP, user_id))
                    class=(LINK_STYLE)
                    download
                {
                    "Backup"
                }
            }
        }
    )
}

fn sql_console_form() -> Markup {
    html!(
        form
            hx-post=(endpoints::ADMIN_SQL_FORM)
            hx-target="#sql-results"
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            div
            {
                label for="query" class=(FORM_LABEL_STYLE) { "SELECT query" }
                textarea
                    name="query"
                    id="query"
                    rows="4"
                    placeholder="SELECT * FROM user"
                    required
                    class={ "font-mono " (FORM_TEXT_INPUT_STYLE) }
                {}
            }

            button type="submit" class={ "max-w-xs " (BUTTON_PRIMARY_STYLE) } { "Run query" }
        }
    )
}

fn admin_view(stats: &AdminStats, users: &[(User, UserProfile)]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ADMIN_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Admin panel" }

                    a href=(endpoints::ADMIN_BACKUP) class=(LINK_STYLE) download
                    {
                        "Download full backup"
                    }
                }

                div id="stats" class="grid gap-4 grid-cols-2 md:grid-cols-4"
                {
                    (stat_card("Users", stats.users))
                    (stat_card("Accounts", stats.accounts))
                    (stat_card("Transactions", stats.transactions))
                    (stat_card("Goals", stats.goals))
                }

                div class="w-full overflow-x-auto dark:bg-gray-800"
                {
                    table id="users" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Username" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Failed log-ins" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for (user, profile) in users {
                                (user_row(user, profile))
                            }
                        }
                    }
                }

                div class=(CARD_STYLE)
                {
                    h2 class="text-lg font-semibold mb-4" { "SQL console" }
                    (sql_console_form())
                    (results_view(None))
                }
            }
        }
    );

    base("Admin", &content)
}
