//! Client-side form validation.
//!
//! Every form is validated before any network call; a non-empty result
//! blocks submission entirely. Errors are keyed by field name - the same
//! shape the backend's structured validation errors are normalized into,
//! so a surface can render both identically.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{LoginCredentials, NoteDraft, PasswordChange, RegisterCredentials};

/// Minimum password length accepted by the registration policy
const PASSWORD_MIN_LENGTH: usize = 6;

/// Username length bounds
const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 20;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email regex is valid"));

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username regex is valid"));

/// Field-keyed validation messages. Empty means the form may be submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    fn put(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.put("email", "Email is required");
    } else if !EMAIL_RE.is_match(email) {
        errors.put("email", "Please enter a valid email address");
    }
}

/// Registration password policy: minimum length plus at least one
/// lowercase letter, one uppercase letter, and one digit.
fn check_password_policy(errors: &mut ValidationErrors, field: &str, password: &str) {
    if password.is_empty() {
        errors.put(field, "Password is required");
    } else if password.len() < PASSWORD_MIN_LENGTH {
        errors.put(
            field,
            format!("Password must be at least {} characters long", PASSWORD_MIN_LENGTH),
        );
    } else if !(password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit()))
    {
        errors.put(
            field,
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }
}

/// Validate a login form: email present and email-shaped, password present.
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(&mut errors, &credentials.email);
    if credentials.password.is_empty() {
        errors.put("password", "Password is required");
    }
    errors.into_result()
}

/// Validate a registration form.
pub fn validate_registration(credentials: &RegisterCredentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let username = &credentials.username;
    if username.is_empty() {
        errors.put("username", "Username is required");
    } else if username.len() < USERNAME_MIN_LENGTH {
        errors.put(
            "username",
            format!("Username must be at least {} characters long", USERNAME_MIN_LENGTH),
        );
    } else if username.len() > USERNAME_MAX_LENGTH {
        errors.put(
            "username",
            format!("Username cannot exceed {} characters", USERNAME_MAX_LENGTH),
        );
    } else if !USERNAME_RE.is_match(username) {
        errors.put(
            "username",
            "Username can only contain letters, numbers, and underscores",
        );
    }

    check_email(&mut errors, &credentials.email);
    check_password_policy(&mut errors, "password", &credentials.password);

    if credentials.confirm_password.is_empty() {
        errors.put("confirm_password", "Please confirm your password");
    } else if credentials.confirm_password != credentials.password {
        errors.put("confirm_password", "Passwords do not match");
    }

    errors.into_result()
}

/// Validate a note form: title and details both non-empty after trimming.
pub fn validate_note(draft: &NoteDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if draft.title.trim().is_empty() {
        errors.put("title", "Title is required");
    }
    if draft.details.trim().is_empty() {
        errors.put("details", "Details are required");
    }
    errors.into_result()
}

/// Validate a password change: current password present, new password per
/// the registration policy.
pub fn validate_password_change(change: &PasswordChange) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if change.current_password.is_empty() {
        errors.put("current_password", "Current password is required");
    }
    check_password_policy(&mut errors, "new_password", &change.new_password);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn registration(username: &str, email: &str, password: &str, confirm: &str) -> RegisterCredentials {
        RegisterCredentials {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_valid_login_passes() {
        assert!(validate_login(&login("ines@example.com", "Secret1x")).is_ok());
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = validate_login(&login("", "")).unwrap_err();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
    }

    #[test]
    fn test_login_rejects_malformed_email() {
        let errors = validate_login(&login("not-an-email", "x")).unwrap_err();
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
    }

    #[test]
    fn test_valid_registration_passes() {
        let creds = registration("ines_42", "ines@example.com", "Secret1x", "Secret1x");
        assert!(validate_registration(&creds).is_ok());
    }

    #[test]
    fn test_registration_username_rules() {
        let too_short = registration("ab", "a@b.co", "Secret1x", "Secret1x");
        assert!(validate_registration(&too_short)
            .unwrap_err()
            .get("username")
            .unwrap()
            .contains("at least 3"));

        let too_long = registration(&"a".repeat(21), "a@b.co", "Secret1x", "Secret1x");
        assert!(validate_registration(&too_long)
            .unwrap_err()
            .get("username")
            .unwrap()
            .contains("exceed 20"));

        let bad_chars = registration("not ok!", "a@b.co", "Secret1x", "Secret1x");
        assert!(validate_registration(&bad_chars)
            .unwrap_err()
            .get("username")
            .unwrap()
            .contains("letters, numbers, and underscores"));
    }

    #[test]
    fn test_registration_password_policy() {
        let short = registration("ines", "a@b.co", "Ab1", "Ab1");
        assert!(validate_registration(&short)
            .unwrap_err()
            .get("password")
            .unwrap()
            .contains("at least 6"));

        // Long enough but missing a digit
        let weak = registration("ines", "a@b.co", "Abcdef", "Abcdef");
        assert!(validate_registration(&weak)
            .unwrap_err()
            .get("password")
            .unwrap()
            .contains("one number"));

        // Missing an uppercase letter
        let lower_only = registration("ines", "a@b.co", "abcde1", "abcde1");
        assert!(validate_registration(&lower_only).is_err());
    }

    #[test]
    fn test_registration_confirmation_must_match() {
        let mismatch = registration("ines", "a@b.co", "Secret1x", "Secret2x");
        assert_eq!(
            validate_registration(&mismatch).unwrap_err().get("confirm_password"),
            Some("Passwords do not match")
        );

        let missing = registration("ines", "a@b.co", "Secret1x", "");
        assert_eq!(
            validate_registration(&missing).unwrap_err().get("confirm_password"),
            Some("Please confirm your password")
        );
    }

    #[test]
    fn test_note_with_empty_details_is_rejected() {
        let draft = NoteDraft {
            title: "Groceries".to_string(),
            details: "".to_string(),
        };
        let errors = validate_note(&draft).unwrap_err();
        assert_eq!(errors.get("details"), Some("Details are required"));
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn test_note_whitespace_only_fields_are_rejected() {
        let draft = NoteDraft {
            title: "   ".to_string(),
            details: "\n\t".to_string(),
        };
        let errors = validate_note(&draft).unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("details").is_some());
    }

    #[test]
    fn test_complete_note_passes() {
        let draft = NoteDraft {
            title: "Groceries".to_string(),
            details: "milk, eggs".to_string(),
        };
        assert!(validate_note(&draft).is_ok());
    }

    #[test]
    fn test_password_change_rules() {
        let change = PasswordChange {
            current_password: "".to_string(),
            new_password: "weak".to_string(),
        };
        let errors = validate_password_change(&change).unwrap_err();
        assert!(errors.get("current_password").is_some());
        assert!(errors.get("new_password").is_some());

        let ok = PasswordChange {
            current_password: "OldSecret1".to_string(),
            new_password: "NewSecret2".to_string(),
        };
        assert!(validate_password_change(&ok).is_ok());
    }

    #[test]
    fn test_errors_display_is_field_keyed() {
        let errors = validate_login(&login("", "")).unwrap_err();
        let rendered = errors.to_string();
        assert!(rendered.contains("email: Email is required"));
        assert!(rendered.contains("password: Password is required"));
    }
}
