//! Plain-text passwords that passed validation, and their bcrypt hashes.

use std::fmt::{self, Display};

use bcrypt::BcryptError;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A plain-text password at least [ValidatedPassword::MIN_LENGTH] characters long.
///
/// The only way to store it is to turn it into a [PasswordHash].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Passwords are counted in characters, not bytes.
    pub const MIN_LENGTH: usize = 6;

    /// # Errors
    ///
    /// Returns [Error::PasswordTooShort] for passwords under [ValidatedPassword::MIN_LENGTH] characters.
    pub fn new(raw: &str) -> Result<Self, Error> {
        if raw.chars().count() >= Self::MIN_LENGTH {
            Ok(Self(raw.to_owned()))
        } else {
            Err(Error::PasswordTooShort(Self::MIN_LENGTH))
        }
    }

    /// Skip the length check, for passwords that were checked elsewhere.
    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

/// A bcrypt hash, as stored in the `user` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The bcrypt work factor used outside of tests.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with a fresh salt. Tests pass a low `cost` to stay fast.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if bcrypt fails, e.g. for an out of range `cost`.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        match bcrypt::hash(&password.0, cost) {
            Ok(hash) => Ok(Self(hash)),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    /// Wrap a hash read from the database.
    pub fn new_unchecked(hash: &str) -> Self {
        Self(hash.to_owned())
    }

    /// Validate and hash `raw_password` in one step.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        Self::new(ValidatedPassword::new(raw_password)?, cost)
    }

    /// Whether `raw_password` hashes to this hash.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        bcrypt::verify(raw_password, &self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::{Error, auth::ValidatedPassword};

    #[test]
    fn new_fails_on_empty() {
        let result = ValidatedPassword::new("");

        assert_eq!(result, Err(Error::PasswordTooShort(6)));
    }

    #[test]
    fn new_fails_on_five_characters() {
        let result = ValidatedPassword::new("abcde");

        assert_eq!(result, Err(Error::PasswordTooShort(6)));
    }

    #[test]
    fn new_counts_characters_not_bytes() {
        assert!(ValidatedPassword::new("пароль").is_ok());
        assert!(ValidatedPassword::new("парол").is_err());
    }

    #[test]
    fn display_hides_password() {
        let password = ValidatedPassword::new_unchecked("hunter22");

        assert_eq!(password.to_string(), "********");
    }
}

#[cfg(test)]
mod password_hash_tests {
    use crate::auth::{PasswordHash, ValidatedPassword};

    #[test]
    fn only_the_original_password_verifies() {
        let hash = PasswordHash::from_raw_password("сбережения2024", 4).unwrap();

        assert!(hash.verify("сбережения2024").unwrap());
        assert!(!hash.verify("сбережения2025").unwrap());
    }

    #[test]
    fn same_password_is_salted_differently() {
        let password = ValidatedPassword::new("monthly-budget").unwrap();
        let hash = PasswordHash::new(password.clone(), 4).unwrap();
        let dupe_hash = PasswordHash::new(password, 4).unwrap();

        assert_ne!(hash, dupe_hash);
    }

    #[test]
    fn from_raw_password_fails_on_short_password() {
        let hash = PasswordHash::from_raw_password("12345", 4);

        assert!(hash.is_err());
    }
}
