//! Validation for the parts of a user's full name.

use std::fmt::Display;

use crate::Error;

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;

/// A validated last name, first name and optional patronymic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    last_name: String,
    first_name: String,
    patronymic: Option<String>,
}

impl FullName {
    /// Trim and validate each part of a name.
    ///
    /// The last name is checked first, then the first name, then the
    /// patronymic. A blank patronymic is treated as missing.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidName] describing the first part that failed validation.
    pub fn new(first_name: &str, last_name: &str, patronymic: Option<&str>) -> Result<Self, Error> {
        let last_name = validate_name_part(last_name, "Last name")?;
        let first_name = validate_name_part(first_name, "First name")?;
        let patronymic = match patronymic.map(str::trim) {
            Some(patronymic) if !patronymic.is_empty() => {
                Some(validate_name_part(patronymic, "Patronymic")?)
            }
            _ => None,
        };

        Ok(Self {
            last_name,
            first_name,
            patronymic,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn patronymic(&self) -> Option<&str> {
        self.patronymic.as_deref()
    }
}

impl Display for FullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.last_name, self.first_name)?;

        if let Some(patronymic) = &self.patronymic {
            write!(f, " {patronymic}")?;
        }

        Ok(())
    }
}

fn is_allowed_name_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || ('а'..='я').contains(&c)
        || ('А'..='Я').contains(&c)
        || c == 'ё'
        || c == 'Ё'
        || c == '-'
        || c == '\''
}

fn validate_name_part(raw_name: &str, field_name: &str) -> Result<String, Error> {
    let name = raw_name.trim();

    if name.is_empty() {
        return Err(Error::InvalidName(format!("{field_name} cannot be empty")));
    }

    let length = name.chars().count();

    if length < MIN_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "{field_name} must contain at least {MIN_NAME_LENGTH} characters"
        )));
    }

    if length > MAX_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "{field_name} must contain at most {MAX_NAME_LENGTH} characters"
        )));
    }

    if !name.chars().all(is_allowed_name_char) {
        return Err(Error::InvalidName(format!(
            "{field_name} may only contain letters, hyphens and apostrophes"
        )));
    }

    if name.starts_with(['-', '\'']) {
        return Err(Error::InvalidName(format!(
            "{field_name} cannot start with a hyphen or apostrophe"
        )));
    }

    if name.ends_with(['-', '\'']) {
        return Err(Error::InvalidName(format!(
            "{field_name} cannot end with a hyphen or apostrophe"
        )));
    }

    if name.contains("--") || name.contains("''") {
        return Err(Error::InvalidName(format!(
            "{field_name} cannot contain double hyphens or apostrophes"
        )));
    }

    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::FullName;

    #[track_caller]
    fn assert_invalid(first: &str, last: &str, patronymic: Option<&str>, want_message: &str) {
        assert_eq!(
            FullName::new(first, last, patronymic),
            Err(Error::InvalidName(want_message.to_owned()))
        );
    }

    #[test]
    fn accepts_latin_and_cyrillic_names() {
        let name = FullName::new(" Анна-Мария ", "O'Neil", Some("Ёжиковна")).unwrap();

        assert_eq!(name.first_name(), "Анна-Мария");
        assert_eq!(name.last_name(), "O'Neil");
        assert_eq!(name.patronymic(), Some("Ёжиковна"));
        assert_eq!(name.to_string(), "O'Neil Анна-Мария Ёжиковна");
    }

    #[test]
    fn blank_patronymic_is_ignored() {
        let name = FullName::new("Ivan", "Petrov", Some("   ")).unwrap();

        assert_eq!(name.patronymic(), None);
        assert_eq!(name.to_string(), "Petrov Ivan");
    }

    #[test]
    fn last_name_is_checked_before_first_name() {
        assert_invalid("", "", None, "Last name cannot be empty");
        assert_invalid("", "Petrov", None, "First name cannot be empty");
    }

    #[test]
    fn rejects_short_and_long_names() {
        assert_invalid("I", "Petrov", None, "First name must contain at least 2 characters");
        assert_invalid(
            "Ivan",
            &"a".repeat(101),
            None,
            "Last name must contain at most 100 characters",
        );
    }

    #[test]
    fn rejects_digits_spaces_and_symbols() {
        for bad_name in ["Iv4n", "Iv an", "Ivan!", "Ivan_"] {
            assert_invalid(
                bad_name,
                "Petrov",
                None,
                "First name may only contain letters, hyphens and apostrophes",
            );
        }
    }

    #[test]
    fn rejects_misplaced_punctuation() {
        assert_invalid("-Ivan", "Petrov", None, "First name cannot start with a hyphen or apostrophe");
        assert_invalid("Ivan'", "Petrov", None, "First name cannot end with a hyphen or apostrophe");
        assert_invalid(
            "Iv--an",
            "Petrov",
            None,
            "First name cannot contain double hyphens or apostrophes",
        );
        assert_invalid(
            "Ivan",
            "Petrov",
            Some("Ivan''ovich"),
            "Patronymic cannot contain double hyphens or apostrophes",
        );
    }
}
