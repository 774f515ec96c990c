//! Request validation for the RecordFlow API

use regex::Regex;
use std::sync::LazyLock;

use recordflow_shared::{validate_field, FieldDefinition};

use crate::error::{AppError, ValidationBuilder};

pub type ValidationResult<T> = Result<T, AppError>;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern"));

/// URL-safe identifiers: lowercase words joined by single hyphens
pub mod slug {
    use super::*;

    pub fn is_valid(value: &str) -> bool {
        SLUG_PATTERN.is_match(value)
    }
}

/// Validator builder for request bodies
pub struct Validator {
    builder: ValidationBuilder,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            builder: ValidationBuilder::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.builder.add(field, message);
        self
    }

    pub fn error_if(self, condition: bool, field: &str, message: &str) -> Self {
        if condition {
            self.error(field, message)
        } else {
            self
        }
    }

    pub fn required_string(self, value: &Option<String>, field: &str) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => self,
            Some(_) => self.error(field, &format!("{} cannot be empty", field)),
            None => self.error(field, &format!("{} is required", field)),
        }
    }

    pub fn max_length(self, value: &Option<String>, field: &str, max: usize) -> Self {
        match value {
            Some(s) if s.chars().count() > max => {
                self.error(field, &format!("{} must be {} characters or less", field, max))
            }
            _ => self,
        }
    }

    /// Only checks the format; a missing slug is reported by `required_string`.
    pub fn slug(self, value: &Option<String>, field: &str) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() && !slug::is_valid(s) => self.error(
                field,
                "Slug may only contain lowercase letters, numbers and single hyphens",
            ),
            _ => self,
        }
    }

    /// Runs `validate_field` on every definition. Errors are keyed by
    /// position, e.g. `fields[2]`.
    pub fn fields(self, fields: &[FieldDefinition], field: &str) -> Self {
        fields.iter().enumerate().fold(self, |v, (i, definition)| {
            match validate_field(definition) {
                Ok(()) => v,
                Err(e) => v.error(&format!("{}[{}]", field, i), &e.to_string()),
            }
        })
    }

    pub fn is_valid(&self) -> bool {
        !self.builder.has_errors()
    }

    pub fn finish(self) -> ValidationResult<()> {
        self.builder.finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
