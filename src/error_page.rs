//! Full-page error views for 403, 404 and 500 responses.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// An error that is shown to the user as a whole page rather than an alert.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPage<'a> {
    /// The user is logged in but may not view the page.
    Forbidden,
    /// No route or resource matched the request.
    NotFound,
    /// Something failed on the server. `description` and `fix` are shown to the user.
    InternalServerError { description: &'a str, fix: &'a str },
}

impl ErrorPage<'static> {
    /// The generic internal server error page.
    pub const INTERNAL: Self = ErrorPage::InternalServerError {
        description: "Sorry, something went wrong.",
        fix: "Try again later or check the server logs",
    };
}

impl ErrorPage<'_> {
    fn status_code(&self) -> StatusCode {
        match self {
            ErrorPage::Forbidden => StatusCode::FORBIDDEN,
            ErrorPage::NotFound => StatusCode::NOT_FOUND,
            ErrorPage::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_html(self) -> Html<String> {
        let markup = match self {
            ErrorPage::Forbidden => error_view(
                "Forbidden",
                "403",
                "Access denied.",
                "Only administrators can open this page.",
            ),
            ErrorPage::NotFound => error_view(
                "Not Found",
                "404",
                "Something's missing.",
                "Sorry, we can't find that page. You'll find lots to explore on the home page.",
            ),
            ErrorPage::InternalServerError { description, fix } => {
                error_view("Internal Server Error", "500", description, fix)
            }
        };

        Html(markup.into_string())
    }
}

impl IntoResponse for ErrorPage<'_> {
    fn into_response(self) -> Response {
        (self.status_code(), self.into_html()).into_response()
    }
}

/// Fallback handler for unknown routes.
pub async fn get_404_not_found() -> Response {
    ErrorPage::NotFound.into_response()
}

/// Route handler for the page clients are redirected to after an internal error.
pub async fn get_internal_server_error_page() -> Response {
    ErrorPage::INTERNAL.into_response()
}
