//! Boundary format checks shared by the store's create paths.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationErrors;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

// Indian mobile numbers, with or without the +91/91 prefix.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+91|91)?[6-9][0-9]{9}$").expect("valid regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_mobile(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Character-count bounds check; records a violation against `field`.
pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    errors: &mut ValidationErrors,
) {
    let len = value.chars().count();
    if len < min {
        errors.add(
            field,
            format!("is too short (minimum is {} characters)", min),
        );
    } else if len > max {
        errors.add(field, format!("is too long (maximum is {} characters)", max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.in"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
    }

    #[test]
    fn test_indian_mobile_format() {
        assert!(is_valid_mobile("9876543210"));
        assert!(is_valid_mobile("+919876543210"));
        assert!(is_valid_mobile("919876543210"));
        assert!(!is_valid_mobile("5876543210")); // must start 6-9
        assert!(!is_valid_mobile("98765")); // too short
        assert!(!is_valid_mobile("+1-555-0100"));
    }

    #[test]
    fn test_length_bounds() {
        let mut errors = ValidationErrors::new();
        check_length("name", "ab", 3, 100, &mut errors);
        assert_eq!(errors.len(), 1);

        let mut errors = ValidationErrors::new();
        check_length("name", &"x".repeat(101), 3, 100, &mut errors);
        assert_eq!(errors.len(), 1);

        let mut errors = ValidationErrors::new();
        check_length("name", "fine", 3, 100, &mut errors);
        assert!(errors.is_empty());
    }
}
