//! Field-level validation shared by every request schema.
//!
//! Each request type implements [`Validate`]; the first failing rule is reported as an
//! [`ApiError::Validation`] naming the field, and the request never reaches persistence.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ApiError;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{12}$").expect("phone pattern is valid"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

static PROMO_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{4,20}$").expect("promo code pattern is valid"));

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn invalid(msg: String) -> Result<(), ApiError> {
    Err(ApiError::Validation(msg))
}

pub fn length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if len < min {
        if min == 1 {
            return invalid(format!("\"{field}\" is not allowed to be empty"));
        }
        return invalid(format!("\"{field}\" length must be at least {min} characters long"));
    }
    if len > max {
        return invalid(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        ));
    }
    Ok(())
}

pub fn optional_length(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<(), ApiError> {
    match value {
        Some(v) => length(field, v, min, max),
        None => Ok(()),
    }
}

pub fn range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < min || value > max {
        return invalid(format!("\"{field}\" must be between {min} and {max}"));
    }
    Ok(())
}

pub fn positive(field: &str, value: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value <= 0.0 {
        return invalid(format!("\"{field}\" must be a positive number"));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < 0.0 {
        return invalid(format!("\"{field}\" must be greater than or equal to 0"));
    }
    Ok(())
}

pub fn phone(value: &str) -> Result<(), ApiError> {
    if !PHONE_RE.is_match(value) {
        return invalid(format!("{value} is not a valid phone number!"));
    }
    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<(), ApiError> {
    if !EMAIL_RE.is_match(value) {
        return invalid(format!("\"{field}\" must be a valid email"));
    }
    Ok(())
}

pub fn promo_code(value: &str) -> Result<(), ApiError> {
    if !PROMO_CODE_RE.is_match(value) {
        return invalid(
            "\"code\" must be 4 to 20 letters or digits".to_string(),
        );
    }
    Ok(())
}
