//! Field checks shared by the config sections

use std::fmt::Display;

pub use crate::error::ValidationError;

type Check = Result<(), ValidationError>;

/// A `[section]` of `config.toml`
pub trait ConfigSection: Default {
    /// Every invalid field in the section, or `Ok`
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Replaces this section's values with `other`'s
    fn merge(&mut self, other: Self);

    /// Table name in `config.toml`
    fn section_name(&self) -> &'static str;
}

/// Checks used by [`ConfigSection::validate`] implementations
pub struct Validator;

impl Validator {
    /// `min..=max`
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Check
    where
        T: PartialOrd + Display + Copy,
    {
        if (min..=max).contains(&value) {
            return Ok(());
        }
        Err(ValidationError::new(field, format!("must be between {min} and {max}")).found(value))
    }

    pub fn not_empty(value: &str, field: &str) -> Check {
        match value.trim() {
            "" => Err(ValidationError::new(field, "must not be empty")),
            _ => Ok(()),
        }
    }

    pub fn one_of<T>(value: &T, allowed: &[T], field: &str) -> Check
    where
        T: PartialEq + Display,
    {
        if allowed.contains(value) {
            return Ok(());
        }
        let choices: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        Err(ValidationError::new(field, format!("must be one of: {}", choices.join(", "))).found(value))
    }

    /// Absolute `http://` or `https://` URL with a host and no spaces
    pub fn is_http_url(value: &str, field: &str) -> Check {
        let host_and_path = ["https://", "http://"]
            .iter()
            .find_map(|scheme| value.strip_prefix(scheme));

        match host_and_path {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') && !rest.contains(' ') => {
                Ok(())
            }
            _ => Err(ValidationError::new(field, "must be an http:// or https:// URL").found(value)),
        }
    }

    /// Keeps the failures; `Ok` when there are none
    pub fn collect_errors(results: Vec<Check>) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
