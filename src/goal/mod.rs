//! Savings goals and how far along they are.

mod api;
mod core;
mod goals_page;
mod progress;

pub use api::{delete_goal_endpoint, list_goals, save_goal_endpoint};
pub use core::{
    Goal, GoalData, GoalId, create_goal_tables, delete_goal, get_goal, get_goals, save_goal,
};
pub use goals_page::{create_goal_form_endpoint, delete_goal_form_endpoint, get_goals_page};
pub use progress::{GoalProgress, calculate_progress, get_goals_with_progress};
