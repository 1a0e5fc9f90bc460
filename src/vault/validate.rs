//! Field limits and input validation.
//!
//! Everything here runs before any SQL is issued, so bad input is
//! reported as `Validation` and never mistaken for storage corruption.

use crate::errors::{Result, VaultedError};

/// Maximum length of vault and credential names.
pub const NAME_MAX_LENGTH: usize = 32;

/// Maximum length of descriptions.
pub const DESCRIPTION_MAX_LENGTH: usize = 64;

/// Maximum length of stored passwords, e-mails and the vault password.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Minimum length of a vault's unlock password.
pub const MASTER_PASSWORD_MIN_LENGTH: usize = 8;

pub fn name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VaultedError::Validation(format!("{field} cannot be empty")));
    }
    max_len(field, value, NAME_MAX_LENGTH)
}

pub fn description(value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => max_len("description", v, DESCRIPTION_MAX_LENGTH),
        None => Ok(()),
    }
}

pub fn email(value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => max_len("email", v, PASSWORD_MAX_LENGTH),
        None => Ok(()),
    }
}

/// A stored credential's secret: required, bounded.
pub fn secret(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(VaultedError::Validation("password cannot be empty".into()));
    }
    max_len("password", value, PASSWORD_MAX_LENGTH)
}

/// The vault's own unlock password.
pub fn master_password(value: &[u8]) -> Result<()> {
    if value.len() < MASTER_PASSWORD_MIN_LENGTH {
        return Err(VaultedError::Validation(format!(
            "vault password must be at least {MASTER_PASSWORD_MIN_LENGTH} characters"
        )));
    }
    if value.len() > PASSWORD_MAX_LENGTH {
        return Err(VaultedError::Validation(format!(
            "vault password cannot exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(VaultedError::Validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(())
}

/// Treat an empty optional text field as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
