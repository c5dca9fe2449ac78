//! Card components for the dashboard.
//!
//! Provides cards showing:
//! - The balance, income and expense totals
//! - Progress towards each savings goal
//! - This month's spending against each budget

use maud::{Markup, html};

use crate::{
    budget_category::{BudgetUsage, budget_status_html, status_style},
    endpoints,
    goal::{Goal, GoalProgress},
    html::{LINK_STYLE, format_currency, progress_bar},
};

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md";

/// A card with a single headline number.
pub(super) fn total_card(title: &str, amount: f64, amount_style: &str) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-600 dark:text-gray-400" { (title) }
            p class={ "text-2xl font-bold tabular-nums " (amount_style) }
            {
                (format_currency(amount))
            }
        }
    }
}

/// Renders the goals section, or a prompt to create a goal if there are none.
pub(super) fn goal_cards_view(goals: &[(Goal, GoalProgress)]) -> Markup {
    html! {
        section class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Goals" }
                a href=(endpoints::GOALS_VIEW) class=(LINK_STYLE) { "Manage" }
            }

            @if goals.is_empty() {
                p class="text-gray-600 dark:text-gray-400"
                {
                    "You have no savings goals yet."
                }
            } @else {
                div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4"
                {
                    @for (goal, progress) in goals {
                        (goal_card(goal, progress))
                    }
                }
            }
        }
    }
}

fn goal_card(goal: &Goal, progress: &GoalProgress) -> Markup {
    let fill_style = if progress.progress_percent >= 100 {
        "bg-green-500"
    } else {
        "bg-blue-600"
    };

    html! {
        div class=(CARD_STYLE) data-goal-id=(goal.id)
        {
            div class="flex justify-between mb-2"
            {
                h4 class="font-semibold truncate" title=(goal.name) { (goal.name) }
                span class="text-sm" { (progress.progress_percent) "%" }
            }

            (progress_bar(progress.progress_percent, fill_style))

            p class="mt-2 text-sm text-gray-600 dark:text-gray-400 tabular-nums"
            {
                (format_currency(progress.calculated_amount))
                " of "
                (format_currency(goal.target_amount))
            }
        }
    }
}

/// Renders this month's budgets.
pub(super) fn budget_cards_view(usage: &[BudgetUsage]) -> Markup {
    html! {
        section class="w-full"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Budget this month" }
                a href=(endpoints::CATEGORIES_VIEW) class=(LINK_STYLE) { "Manage" }
            }

            @if usage.is_empty() {
                p class="text-gray-600 dark:text-gray-400"
                {
                    "Set a monthly budget for a category to track your spending."
                }
            } @else {
                div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4"
                {
                    @for item in usage {
                        (budget_card(item))
                    }
                }
            }
        }
    }
}

fn budget_card(usage: &BudgetUsage) -> Markup {
    let (fill_style, _) = status_style(&usage.status);
    let category = &usage.category;

    html! {
        div class=(CARD_STYLE)
        {
            div class="flex justify-between mb-2"
            {
                h4 class="font-semibold truncate"
                {
                    @if !category.emoji.is_empty() {
                        span class="mr-2" { (category.emoji) }
                    }
                    (category.name)
                }
                span class="text-sm tabular-nums"
                {
                    (format_currency(usage.spent)) " / " (format_currency(category.budget))
                }
            }

            (progress_bar(usage.progress_percent, fill_style))
            (budget_status_html(usage))
        }
    }
}
