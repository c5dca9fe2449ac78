//! Users, their profiles, log-in with lockout, and the cookie based auth middleware.

mod account_locked;
mod cookie;
mod full_name;
mod lockout;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod profile;
mod profile_page;
mod redirect;
mod register_user;
mod token;
mod user;

pub use account_locked::get_account_locked_page;
pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use full_name::FullName;
pub use lockout::{
    BlockSummary, LogInOutcome, MAX_FAILED_LOG_IN_ATTEMPTS, block_users, reset_log_in_attempts,
    unblock_users,
};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{
    auth_guard, auth_guard_hx, auth_guard_json, superuser_guard, superuser_guard_page,
};
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{UserProfile, create_profile_table, get_profile, update_profile_names};
pub use profile_page::{get_profile_page, update_profile_form_endpoint};
pub use redirect::normalize_redirect_url;
pub use register_user::{get_register_page, register_user};
pub(super) use token::Token;
pub use user::{
    Role, User, UserID, Username, count_users, create_user, create_user_table, get_all_users,
    get_user_by_id, get_user_by_username, set_password,
};

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;

#[cfg(test)]
pub use middleware::AuthState;
