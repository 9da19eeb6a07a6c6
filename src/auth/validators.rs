use super::models::{LoginRequest, Role, SignupRequest};
use crate::common::validation::require_text;
use crate::common::{ValidationResult, Validator};

pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "sw"];

impl Validator for SignupRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        let email = self.email.trim();
        if email.is_empty() {
            result.add_error("email", "is required");
        } else if !looks_like_email(email) {
            result.add_error("email", "must be a valid email address");
        } else if email.len() > 254 {
            result.add_error("email", "must not exceed 254 characters");
        }

        if self.password.is_empty() {
            result.add_error("password", "is required");
        } else if self.password.len() > 1024 {
            result.add_error("password", "must not exceed 1024 bytes");
        }

        if self.role.parse::<Role>().is_err() {
            result.add_error("role", "must be 'student' or 'teacher'");
        }

        if self.first_name.chars().count() > 100 {
            result.add_error("first_name", "must not exceed 100 characters");
        }
        if self.last_name.chars().count() > 100 {
            result.add_error("last_name", "must not exceed 100 characters");
        }

        if let Some(lang) = &self.language_preference {
            if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
                result.add_error("language_preference", "must be 'en' or 'sw'");
            }
        }

        result
    }
}

impl Validator for LoginRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        require_text(&mut result, "email", &self.email, 254);
        if self.password.is_empty() {
            result.add_error("password", "is required");
        }
        result
    }
}

/// One `@` with non-empty local part and a dotted domain
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
