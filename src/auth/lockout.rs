//! Blocks a user after too many failed log-in attempts.
//!
//! Each failed attempt increments a counter stored in the user's profile and a
//! successful attempt resets it. Reaching [MAX_FAILED_LOG_IN_ATTEMPTS] blocks
//! the user until an administrator unblocks them. Blocked users cannot log in,
//! even with the correct password.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{Error, auth::UserID};

/// The number of consecutive failed log-in attempts that blocks a user.
pub const MAX_FAILED_LOG_IN_ATTEMPTS: u8 = 3;

/// The lockout fields of a user profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    /// The number of consecutive failed log-in attempts.
    pub failed_attempts: u8,
    /// When the user was blocked, `None` if the user is not blocked.
    pub blocked_at: Option<OffsetDateTime>,
}

impl LockoutState {
    pub fn is_blocked(&self) -> bool {
        self.blocked_at.is_some()
    }

    /// The number of failed attempts left before the user is blocked.
    pub fn attempts_remaining(&self) -> u8 {
        MAX_FAILED_LOG_IN_ATTEMPTS.saturating_sub(self.failed_attempts)
    }

    /// The state after the user entered the correct password.
    pub fn after_success(self) -> Self {
        Self {
            failed_attempts: 0,
            ..self
        }
    }

    /// The state after the user entered the wrong password at `now`.
    pub fn after_failure(self, now: OffsetDateTime) -> Self {
        let failed_attempts = self
            .failed_attempts
            .saturating_add(1)
            .min(MAX_FAILED_LOG_IN_ATTEMPTS);

        let blocked_at = if failed_attempts >= MAX_FAILED_LOG_IN_ATTEMPTS {
            self.blocked_at.or(Some(now))
        } else {
            self.blocked_at
        };

        Self {
            failed_attempts,
            blocked_at,
        }
    }
}

/// The result of checking a log-in attempt against the lockout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogInOutcome {
    /// The password was correct and the user is not blocked.
    Authenticated,
    /// The user is blocked, either before or because of this attempt.
    Blocked,
    /// The password was wrong, but the user may try again.
    Rejected { attempts_remaining: u8 },
}

pub fn get_lockout_state(user_id: UserID, connection: &Connection) -> Result<LockoutState, Error> {
    connection
        .query_row(
            "SELECT failed_login_attempts, blocked_at FROM user_profile WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| {
                Ok(LockoutState {
                    failed_attempts: row.get(0)?,
                    blocked_at: row.get(1)?,
                })
            },
        )
        .map_err(Error::from)
}

fn save_lockout_state(
    user_id: UserID,
    state: &LockoutState,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE user_profile SET failed_login_attempts = ?1, is_blocked = ?2, blocked_at = ?3
        WHERE user_id = ?4",
        (
            state.failed_attempts,
            state.is_blocked(),
            state.blocked_at,
            user_id.as_i64(),
        ),
    )?;

    Ok(())
}

/// Update the lockout state of `user_id` after a log-in attempt.
///
/// The state is read and written in a single SQL transaction. Callers must
/// hold the database connection lock for the duration of the call, so
/// concurrent attempts cannot skip past the attempt limit.
///
/// The state of a blocked user is never changed.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no profile, or an SQL error.
pub fn record_log_in_attempt(
    user_id: UserID,
    password_is_correct: bool,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<LogInOutcome, Error> {
    let transaction = connection.unchecked_transaction()?;
    let state = get_lockout_state(user_id, &transaction)?;

    if state.is_blocked() {
        return Ok(LogInOutcome::Blocked);
    }

    let (new_state, outcome) = if password_is_correct {
        (state.after_success(), LogInOutcome::Authenticated)
    } else {
        let new_state = state.after_failure(now);
        let outcome = if new_state.is_blocked() {
            LogInOutcome::Blocked
        } else {
            LogInOutcome::Rejected {
                attempts_remaining: new_state.attempts_remaining(),
            }
        };

        (new_state, outcome)
    };

    if new_state != state {
        save_lockout_state(user_id, &new_state, &transaction)?;
    }

    transaction.commit()?;

    if outcome == LogInOutcome::Blocked {
        tracing::warn!("User {user_id} was blocked after {MAX_FAILED_LOG_IN_ATTEMPTS} failed log-in attempts");
    }

    Ok(outcome)
}

/// The result of blocking a batch of users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockSummary {
    /// The number of users that were blocked, including users that were already blocked.
    pub blocked: usize,
    /// The number of superusers left untouched.
    pub skipped_superusers: usize,
}

/// Block each user in `user_ids` that is not a superuser.
///
/// Users that are already blocked keep their original `blocked_at`. IDs of
/// users that do not exist are ignored.
pub fn block_users(
    user_ids: &[UserID],
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<BlockSummary, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut summary = BlockSummary::default();

    for user_id in user_ids {
        let is_superuser: Option<bool> = transaction
            .query_row(
                "SELECT is_superuser FROM user WHERE id = ?1",
                [user_id.as_i64()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                error => Err(error),
            })?;

        match is_superuser {
            Some(true) => summary.skipped_superusers += 1,
            Some(false) => {
                transaction.execute(
                    "UPDATE user_profile
                    SET is_blocked = 1, blocked_at = COALESCE(blocked_at, ?1)
                    WHERE user_id = ?2",
                    (now, user_id.as_i64()),
                )?;
                summary.blocked += 1;
            }
            None => {}
        }
    }

    transaction.commit()?;
    tracing::info!(
        "Blocked {} users, skipped {} superusers",
        summary.blocked,
        summary.skipped_superusers
    );

    Ok(summary)
}

fn update_each(user_ids: &[UserID], query: &str, connection: &Connection) -> Result<usize, Error> {
    let transaction = connection.unchecked_transaction()?;
    let mut rows_affected = 0;

    {
        let mut statement = transaction.prepare(query)?;
        for user_id in user_ids {
            rows_affected += statement.execute([user_id.as_i64()])?;
        }
    }

    transaction.commit()?;

    Ok(rows_affected)
}

/// Unblock each user in `user_ids` and clear their failed log-in attempts.
///
/// Returns the number of profiles that were updated.
pub fn unblock_users(user_ids: &[UserID], connection: &Connection) -> Result<usize, Error> {
    let count = update_each(
        user_ids,
        "UPDATE user_profile SET is_blocked = 0, blocked_at = NULL, failed_login_attempts = 0
        WHERE user_id = ?1",
        connection,
    )?;
    tracing::info!("Unblocked {count} users");

    Ok(count)
}

/// Set the failed log-in attempts of each user in `user_ids` to zero without unblocking them.
///
/// Returns the number of profiles that were updated.
pub fn reset_log_in_attempts(user_ids: &[UserID], connection: &Connection) -> Result<usize, Error> {
    update_each(
        user_ids,
        "UPDATE user_profile SET failed_login_attempts = 0 WHERE user_id = ?1",
        connection,
    )
}

#[cfg(test)]
mod lockout_state_tests {
    use time::macros::datetime;

    use super::{LockoutState, MAX_FAILED_LOG_IN_ATTEMPTS};

    #[test]
    fn failures_increment_until_blocked() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let state = LockoutState::default();

        let state = state.after_failure(now);
        assert_eq!(state.failed_attempts, 1);
        assert_eq!(state.attempts_remaining(), 2);
        assert!(!state.is_blocked());

        let state = state.after_failure(now).after_failure(now);
        assert_eq!(state.failed_attempts, MAX_FAILED_LOG_IN_ATTEMPTS);
        assert_eq!(state.blocked_at, Some(now));
    }

    #[test]
    fn success_resets_attempts() {
        let now = datetime!(2025-01-01 12:00 UTC);
        let state = LockoutState::default().after_failure(now).after_failure(now);

        assert_eq!(state.after_success(), LockoutState::default());
    }

    #[test]
    fn attempts_never_exceed_limit_and_block_time_is_kept() {
        let first = datetime!(2025-01-01 12:00 UTC);
        let later = datetime!(2025-01-02 12:00 UTC);
        let blocked = LockoutState {
            failed_attempts: MAX_FAILED_LOG_IN_ATTEMPTS,
            blocked_at: Some(first),
        };

        let state = blocked.after_failure(later);

        assert_eq!(state.failed_attempts, MAX_FAILED_LOG_IN_ATTEMPTS);
        assert_eq!(state.blocked_at, Some(first));
    }
}

#[cfg(test)]
mod record_log_in_attempt_tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        auth::{PasswordHash, Role, User, UserID, Username, create_user, profile::get_profile},
        db::initialize,
    };

    use super::{LogInOutcome, get_lockout_state, record_log_in_attempt};

    fn get_test_connection_and_user() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            Username::new("ivan").unwrap(),
            PasswordHash::new_unchecked("hash"),
            None,
            Role::Regular,
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn failed_attempt_increments_counter() {
        let (connection, user) = get_test_connection_and_user();

        let outcome =
            record_log_in_attempt(user.id, false, OffsetDateTime::now_utc(), &connection).unwrap();

        assert_eq!(
            outcome,
            LogInOutcome::Rejected {
                attempts_remaining: 2
            }
        );
        assert_eq!(get_profile(user.id, &connection).unwrap().failed_log_in_attempts, 1);
    }

    #[test]
    fn successful_attempt_resets_counter() {
        let (connection, user) = get_test_connection_and_user();
        let now = OffsetDateTime::now_utc();
        record_log_in_attempt(user.id, false, now, &connection).unwrap();
        record_log_in_attempt(user.id, false, now, &connection).unwrap();

        let outcome = record_log_in_attempt(user.id, true, now, &connection).unwrap();

        assert_eq!(outcome, LogInOutcome::Authenticated);
        assert_eq!(get_profile(user.id, &connection).unwrap().failed_log_in_attempts, 0);
    }

    #[test]
    fn third_failure_blocks_user() {
        let (connection, user) = get_test_connection_and_user();
        let now = datetime!(2025-03-04 05:06:07 UTC);

        for _ in 0..2 {
            record_log_in_attempt(user.id, false, now, &connection).unwrap();
        }
        let outcome = record_log_in_attempt(user.id, false, now, &connection).unwrap();

        assert_eq!(outcome, LogInOutcome::Blocked);
        let profile = get_profile(user.id, &connection).unwrap();
        assert!(profile.is_blocked());
        assert_eq!(profile.blocked_at, Some(now));
        assert_eq!(profile.failed_log_in_attempts, 3);
    }

    #[test]
    fn blocked_user_with_correct_password_stays_blocked() {
        let (connection, user) = get_test_connection_and_user();
        let now = OffsetDateTime::now_utc();
        for _ in 0..3 {
            record_log_in_attempt(user.id, false, now, &connection).unwrap();
        }
        let state_before = get_lockout_state(user.id, &connection).unwrap();

        let outcome = record_log_in_attempt(user.id, true, now, &connection).unwrap();

        assert_eq!(outcome, LogInOutcome::Blocked);
        assert_eq!(get_lockout_state(user.id, &connection).unwrap(), state_before);
    }

    #[test]
    fn missing_user_is_not_found() {
        let (connection, _) = get_test_connection_and_user();

        let result =
            record_log_in_attempt(UserID::new(999), true, OffsetDateTime::now_utc(), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }
}
