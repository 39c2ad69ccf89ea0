use lazy_regex::regex_is_match;

use crate::auth::models::{LoginPayload, SignupPayload};
use crate::{Error, Result};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_USERNAME_LEN: usize = 30;

pub struct AccountValidator;

impl AccountValidator {
    pub fn validate_signup(payload: &SignupPayload) -> Result<()> {
        Self::validate_email(&payload.email)?;

        if payload.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let username = payload.username.trim();
        if username.is_empty() {
            return Err(Error::invalid("username", "is required"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(Error::invalid(
                "username",
                format!("must be at most {MAX_USERNAME_LEN} characters"),
            ));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(Error::invalid("username", "must not contain spaces"));
        }

        Ok(())
    }

    pub fn validate_login(payload: &LoginPayload) -> Result<()> {
        if payload.email.trim().is_empty() {
            return Err(Error::invalid("email", "is required"));
        }
        if payload.password.is_empty() {
            return Err(Error::invalid("password", "is required"));
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::invalid("email", "is required"));
        }
        if !regex_is_match!(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", email) {
            return Err(Error::invalid("email", "is not a valid email address"));
        }
        Ok(())
    }
}
