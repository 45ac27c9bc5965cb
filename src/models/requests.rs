use serde::Deserialize;

use crate::error::{msg, AppError, Result};

const MIN_PASSWORD_LEN: usize = 8;

/// Basic email format validation.
///
/// Intentionally permissive - a sanity check, not RFC 5322. The identity
/// backend applies its own rules; this only rejects obvious garbage before
/// any external call is made.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        validate_email_format(&self.email)?;
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(msg::PASSWORD_TOO_SHORT.into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::BadRequest(msg::PASSWORD_TOO_SHORT.into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct OnboardRequest {
    pub name: String,
}

impl OnboardRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        Ok(())
    }
}
