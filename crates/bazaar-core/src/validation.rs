//! Input validation for DTOs.
//!
//! Every create/update payload implements [`Validate`]; services call it
//! before touching the store.

use rust_decimal::Decimal;

use crate::error::AppError;

/// Validates a DTO before it reaches the store.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), AppError> {
        self.iter().try_for_each(Validate::validate)
    }
}

/// Required text: non-blank and at most `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(field, "must not be blank"));
    }
    if value.chars().count() > max {
        return Err(AppError::invalid(
            field,
            &format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Optional text: checked like [`text`] only when present.
pub fn opt_text(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) => text(field, v, max),
        None => Ok(()),
    }
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    text(field, value, 254)?;

    let Some((local, domain)) = value.split_once('@') else {
        return Err(AppError::invalid(field, "must be a valid email address"));
    };
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace);

    if well_formed {
        Ok(())
    } else {
        Err(AppError::invalid(field, "must be a valid email address"))
    }
}

pub fn non_negative(field: &str, value: Decimal) -> Result<(), AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::invalid(field, "must not be negative"));
    }
    Ok(())
}

pub fn positive(field: &str, value: i64) -> Result<(), AppError> {
    if value <= 0 {
        return Err(AppError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

pub fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::invalid(
            field,
            &format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}
