use crate::utils::error::{Result, SorteoError};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SorteoError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Billing increments must strictly add to a client's total.
pub fn validate_positive_amount(field_name: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(SorteoError::ValidationError {
            message: format!("{} must be a positive amount, got {}", field_name, value),
        });
    }
    Ok(())
}

pub fn validate_non_negative_amount(field_name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(SorteoError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Amount cannot be negative".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u32, min_value: u32) -> Result<()> {
    if value < min_value {
        return Err(SorteoError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 驗證值不重複
pub fn validate_unique<T, I>(field_name: &str, values: I) -> Result<()>
where
    T: Eq + Hash + Display,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    for value in values {
        if seen.contains(&value) {
            return Err(SorteoError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Value must be unique".to_string(),
            });
        }
        seen.insert(value);
    }
    Ok(())
}

/// Positions must be exactly `1..=n` in some order.
pub fn validate_dense_positions(field_name: &str, positions: &[u32]) -> Result<()> {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();

    for (expected, actual) in (1u32..).zip(sorted.iter()) {
        if *actual != expected {
            return Err(SorteoError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format!("{:?}", positions),
                reason: format!(
                    "Positions must be unique and dense starting at 1 (expected {}, found {})",
                    expected, actual
                ),
            });
        }
    }
    Ok(())
}
