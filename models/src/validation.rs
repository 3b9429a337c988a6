// models/src/validation.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::FieldError;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()./-]{2,}$").expect("phone regex"));

/// A non-empty string no longer than `max` characters.
pub fn required(errors: &mut Vec<FieldError>, field: &'static str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "required"));
    } else if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
}

/// An optional string no longer than `max` characters when present.
pub fn optional(errors: &mut Vec<FieldError>, field: &'static str, value: &Option<String>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(FieldError::new(
                field,
                format!("must be at most {max} characters"),
            ));
        }
    }
}

pub fn email(errors: &mut Vec<FieldError>, field: &'static str, value: &Option<String>, max: usize) {
    optional(errors, field, value, max);
    if let Some(value) = value {
        if !value.is_empty() && !EMAIL_RE.is_match(value) {
            errors.push(FieldError::new(field, "not a valid email address"));
        }
    }
}

pub fn phone(errors: &mut Vec<FieldError>, field: &'static str, value: &Option<String>, max: usize) {
    optional(errors, field, value, max);
    if let Some(value) = value {
        if !value.is_empty() && !PHONE_RE.is_match(value) {
            errors.push(FieldError::new(field, "not a valid phone number"));
        }
    }
}

pub fn range_i32(errors: &mut Vec<FieldError>, field: &'static str, value: i32, min: i32, max: i32) {
    if value < min || value > max {
        errors.push(FieldError::new(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
}

pub fn range_f64(errors: &mut Vec<FieldError>, field: &'static str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(FieldError::new(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
}

/// A relationship picker value; zero marks an unselected reference.
pub fn reference(errors: &mut Vec<FieldError>, field: &'static str, id: u64) {
    if id == 0 {
        errors.push(FieldError::new(field, "required"));
    }
}
