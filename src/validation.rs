//! Checks shared by the forms and the JSON API.

use axum::{Json, extract::rejection::JsonRejection};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The format of dates in forms, the JSON API and exports.
pub const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

/// Trim `raw` and check that it is not empty and has at most `max_length` characters.
pub fn required_text(field: &'static str, raw: &str, max_length: usize) -> Result<String, Error> {
    let text = raw.trim();

    if text.is_empty() {
        return Err(Error::EmptyField(field));
    }

    if text.chars().count() > max_length {
        return Err(Error::TooLong {
            field,
            max: max_length,
        });
    }

    Ok(text.to_owned())
}

/// Check that `amount` is a finite number that is zero or more.
pub fn non_negative_amount(field: &'static str, amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(Error::NegativeAmount(field))
    }
}

/// Check that `amount` is a finite number greater than zero.
pub fn positive_amount(field: &'static str, amount: f64) -> Result<f64, Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::NonPositiveAmount(field))
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// Unwrap a JSON request body, turning axum's rejection into an [Error] so the
/// client gets the usual `{"success": false, "error": ...}` response.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::InvalidRequestBody(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::Error;

    use super::{non_negative_amount, parse_date, positive_amount, required_text};

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("name", "  Cash  ", 10), Ok("Cash".to_owned()));
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(required_text("name", "   ", 10), Err(Error::EmptyField("name")));
    }

    #[test]
    fn required_text_counts_characters_not_bytes() {
        assert_eq!(required_text("name", "Копилка", 7), Ok("Копилка".to_owned()));
        assert_eq!(
            required_text("name", "Копилка!", 7),
            Err(Error::TooLong {
                field: "name",
                max: 7
            })
        );
    }

    #[test]
    fn amounts() {
        assert_eq!(non_negative_amount("amount", 0.0), Ok(0.0));
        assert_eq!(
            non_negative_amount("amount", -0.01),
            Err(Error::NegativeAmount("amount"))
        );
        assert_eq!(
            positive_amount("amount", 0.0),
            Err(Error::NonPositiveAmount("amount"))
        );
        assert_eq!(
            positive_amount("amount", f64::NAN),
            Err(Error::NonPositiveAmount("amount"))
        );
        assert_eq!(positive_amount("amount", 12.5), Ok(12.5));
    }

    #[test]
    fn dates() {
        assert_eq!(parse_date("2024-02-29"), Ok(date!(2024 - 02 - 29)));
        assert_eq!(
            parse_date("29.02.2024"),
            Err(Error::InvalidDate("29.02.2024".to_owned()))
        );
    }
}
