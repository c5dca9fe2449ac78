//! Alert messages rendered into the page's alert container via an out-of-band swap.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// A success or error message shown to the user after an HTMX request.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, Some(details)),
            Alert::SuccessSimple { message } => (false, message, None),
            Alert::Error { message, details } => (true, message, Some(details)),
            Alert::ErrorSimple { message } => (true, message, None),
        };

        let style = if is_error {
            "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 \
            dark:text-red-400 border border-red-300 dark:border-red-800"
        } else {
            "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 \
            dark:text-green-400 border border-green-300 dark:border-green-800"
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(style) role="alert"
                {
                    div class="flex justify-between items-start gap-4"
                    {
                        div
                        {
                            p class="font-medium" { (message) }

                            @if let Some(details) = details {
                                @if !details.is_empty() {
                                    p class="mt-1" { (details) }
                                }
                            }
                        }

                        button
                            type="button"
                            class="font-bold"
                            aria-label="Dismiss"
                            onclick="this.closest('[role=alert]').remove()"
                        {
                            "×"
                        }
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::Alert;

    #[test]
    fn error_alert_renders_message_and_details() {
        let html = Alert::Error {
            message: "Could not save".to_owned(),
            details: "Try again".to_owned(),
        }
        .into_html()
        .into_string();

        let fragment = Html::parse_fragment(&html);
        let paragraphs = fragment
            .select(&Selector::parse("p").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();

        assert_eq!(paragraphs, vec!["Could not save", "Try again"]);
        assert!(html.contains("text-red-800"));
    }

    #[test]
    fn simple_success_alert_has_no_details() {
        let html = Alert::SuccessSimple {
            message: "Saved".to_owned(),
        }
        .into_html()
        .into_string();

        let fragment = Html::parse_fragment(&html);
        let paragraph_count = fragment.select(&Selector::parse("p").unwrap()).count();

        assert_eq!(paragraph_count, 1);
        assert!(html.contains("hx-swap-oob=\"true\""));
    }
}
