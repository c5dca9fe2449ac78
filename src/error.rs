//! Defines the app level error type and conversions to rendered HTML pages, alerts and JSON.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{alert::Alert, error_page::ErrorPage};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token cookie could not be serialized or deserialized.
    #[error("invalid auth token: {0}")]
    InvalidToken(String),

    /// A date time could not be calculated or formatted.
    #[error("could not format the date time: {0}")]
    InvalidDateFormat(String),

    /// The password does not meet the minimum requirements.
    #[error("password must be at least {0} characters long")]
    PasswordTooShort(usize),

    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordsDoNotMatch,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is empty, too long or contains characters that are not allowed.
    #[error("{0}")]
    InvalidUsername(String),

    /// Another user already registered the username.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// No user is registered with the given username.
    #[error("user not found")]
    UserNotFound,

    /// A first name, last name or patronymic failed validation.
    #[error("{0}")]
    InvalidName(String),

    /// A required name was empty.
    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    /// A required text field was empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A text field exceeded its maximum length.
    #[error("{field} cannot be longer than {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// An amount that must not be negative was negative.
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),

    /// An amount that must be strictly positive was zero or negative.
    #[error("{0} must be greater than zero")]
    NonPositiveAmount(&'static str),

    /// The account type is not one of the supported account types.
    #[error("unknown account type \"{0}\"")]
    InvalidAccountType(String),

    /// The transaction type is neither income nor expense.
    #[error("unknown transaction type \"{0}\"")]
    InvalidTransactionType(String),

    /// The transaction category is not one of the supported categories.
    #[error("unknown transaction category \"{0}\"")]
    InvalidCategory(String),

    /// A date string was not in the YYYY-MM-DD format.
    #[error("invalid date \"{0}\", expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The account ID does not refer to an account owned by the user.
    #[error("account {0} does not exist")]
    InvalidAccount(i64),

    /// The user already has a budget category with this name.
    #[error("the budget category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The SQL console only runs queries that start with SELECT.
    #[error("only SELECT queries are allowed")]
    NotASelectQuery,

    /// The SQL console query contains a blocked keyword.
    #[error("the query contains the forbidden keyword \"{0}\"")]
    ForbiddenKeyword(String),

    /// SQLite rejected a query from the SQL console.
    #[error("could not run the query: {0}")]
    InvalidQuery(String),

    /// An imported JSON document does not have the expected structure.
    #[error("invalid import file: {0}")]
    InvalidImport(String),

    /// A field of an imported row has the wrong JSON type.
    #[error("\"{field}\" must be {expected}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
    },

    /// The JSON request body is malformed or is missing fields.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The user may not access the requested resource.
    #[error("access denied")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// Whether the error was caused by bad input from the client.
    fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::PasswordTooShort(_)
                | Error::PasswordsDoNotMatch
                | Error::InvalidUsername(_)
                | Error::DuplicateUsername(_)
                | Error::InvalidName(_)
                | Error::EmptyName(_)
                | Error::EmptyField(_)
                | Error::TooLong { .. }
                | Error::NegativeAmount(_)
                | Error::NonPositiveAmount(_)
                | Error::InvalidAccountType(_)
                | Error::InvalidTransactionType(_)
                | Error::InvalidCategory(_)
                | Error::InvalidDate(_)
                | Error::InvalidAccount(_)
                | Error::DuplicateCategoryName(_)
                | Error::NotASelectQuery
                | Error::ForbiddenKeyword(_)
                | Error::InvalidQuery(_)
                | Error::InvalidImport(_)
                | Error::WrongFieldType { .. }
                | Error::InvalidRequestBody(_)
                | Error::MultipartError(_)
        )
    }

    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound | Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::CookieMissing | Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            error if error.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show to the client.
    ///
    /// Server side errors are replaced with a generic message and logged.
    fn client_message(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            return "An unexpected error occurred, check the server logs for more details."
                .to_owned();
        }

        capitalise_first_char(&self.to_string())
    }

    /// Convert the error into a JSON response of the form `{"success": false, "error": "..."}`.
    pub fn into_json_response(self) -> Response {
        let status_code = self.status_code();
        let body = json!({
            "success": false,
            "error": self.client_message(),
        });

        (status_code, Json(body)).into_response()
    }

    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let status_code = self.status_code();
        let alert = match &self {
            Error::InvalidTimezoneError(timezone) => Alert::Error {
                message: "Invalid Timezone Settings".to_owned(),
                details: format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            },
            Error::NotFound => Alert::Error {
                message: "Not found".to_owned(),
                details: "The item could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                    .to_owned(),
            },
            error if error.is_client_error() => Alert::Error {
                message: "Invalid input".to_owned(),
                details: error.client_message(),
            },
            _ => Alert::Error {
                message: "Something went wrong".to_owned(),
                details: self.client_message(),
            },
        };

        (status_code, alert.into_html()).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => ErrorPage::NotFound.into_response(),
            Error::Forbidden => ErrorPage::Forbidden.into_response(),
            Error::InvalidTimezoneError(timezone) => ErrorPage::InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => ErrorPage::INTERNAL.into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                ErrorPage::INTERNAL.into_response()
            }
        }
    }
}

/// Capitalise the first character of an error message for display.
pub fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
