//! The token stored in the auth cookie.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::UserID;

/// Identifies the logged in user until `expires_at`.
///
/// The expiry is stored as a Unix timestamp, so sub-second precision is lost
/// when the token is read back from the cookie.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::auth::{Token, UserID};

    #[test]
    fn token_serializes_expiry_as_unix_timestamp() {
        let token = Token {
            user_id: UserID::new(7),
            expires_at: datetime!(2025-12-21 00:00:00 UTC),
        };

        let serialized = serde_json::to_string(&token).unwrap();

        assert_eq!(serialized, r#"{"user_id":7,"expires_at":1766275200}"#);
        assert_eq!(serde_json::from_str::<Token>(&serialized).unwrap(), token);
    }

    #[test]
    fn token_rejects_formatted_dates() {
        let result =
            serde_json::from_str::<Token>(r#"{"user_id":7,"expires_at":"2025-12-21 00:00:00"}"#);

        assert!(result.is_err());
    }
}
