use serde_json::json;
use tracing::{info, warn};

use crate::auth::models::{LoginPayload, SignupPayload, UserSession};
use crate::backend::{Backend, BackendError};
use crate::error::{Error, Result};
use crate::validators::account_validator::AccountValidator;

#[derive(Debug)]
pub enum SignupOutcome {
    SignedIn(UserSession),
    /// The account exists but the email must be confirmed before login.
    ConfirmEmail,
}

pub struct AuthService;

impl AuthService {
    /// Creates the account with the anon client and its profile row with the
    /// service-role client.
    pub async fn register_user(
        db: &dyn Backend,
        admin: &dyn Backend,
        payload: &SignupPayload,
    ) -> Result<SignupOutcome> {
        AccountValidator::validate_signup(payload)?;

        let email = payload.email.trim();
        let username = payload.username.trim();

        let result = db
            .sign_up(email, &payload.password, json!({ "username": username }))
            .await
            .map_err(|err| match err {
                BackendError::Http { status, .. } if (400..500).contains(&status) => {
                    Error::invalid("email", "could not create an account with this email")
                }
                BackendError::Conflict(_) => {
                    Error::invalid("email", "could not create an account with this email")
                }
                other => other.into(),
            })?;

        let profile = json!({
            "id": result.user.id,
            "username": username,
            "email": email,
        });
        match admin.insert("profiles", profile).await {
            Ok(_) | Err(BackendError::Conflict(_)) => {}
            // The profile is recreated lazily on first visit.
            Err(err) => warn!("could not create profile for {}: {err}", result.user.id),
        }

        info!("new account {}", result.user.id);

        Ok(match result.session {
            Some(session) => SignupOutcome::SignedIn(UserSession::from_auth(&session)),
            None => SignupOutcome::ConfirmEmail,
        })
    }

    pub async fn login_user(db: &dyn Backend, payload: &LoginPayload) -> Result<UserSession> {
        AccountValidator::validate_login(payload)?;

        let session = db
            .sign_in(payload.email.trim(), &payload.password)
            .await
            .map_err(|err| match err {
                BackendError::Unauthorized(_) => Error::LoginFail,
                other => other.into(),
            })?;

        info!("user {} logged in", session.user.id);
        Ok(UserSession::from_auth(&session))
    }

    /// Best effort: the local session is dropped whatever the service says.
    pub async fn logout_user(db: &dyn Backend, access_token: &str) {
        if let Err(err) = db.sign_out(access_token).await {
            warn!("sign out failed: {err}");
        }
    }

    /// Requests a reset email. The outcome is never revealed to the caller.
    pub async fn forgot_password(db: &dyn Backend, email: &str, redirect_to: &str) -> Result<()> {
        AccountValidator::validate_email(email)?;

        if let Err(err) = db
            .reset_password_email(email.trim(), Some(redirect_to))
            .await
        {
            warn!("password reset request failed: {err}");
        }
        Ok(())
    }
}
