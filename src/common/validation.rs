// Request validation types shared by the feature modules

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Converts into `Err` when any rule failed
    pub fn into_result(self) -> Result<(), super::ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Implemented by request payloads that carry their own validation rules
pub trait Validator {
    fn validate(&self) -> ValidationResult;
}

/// Rejects blank strings and strings longer than `max` characters
pub fn require_text(result: &mut ValidationResult, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        result.add_error(field, "is required");
    } else if value.chars().count() > max {
        result.add_error(field, &format!("must not exceed {} characters", max));
    }
}
