use serde::{Deserialize, Serialize};

use crate::backend::AuthSession;

#[derive(Debug, Deserialize)]
pub struct SignupPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordPayload {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Reads the `role` claim the identity service keeps in `app_metadata`.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }
}

/// What the signed session cookie carries between requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which `access_token` expires.
    pub expires_at: i64,
}

impl UserSession {
    pub fn from_auth(auth: &AuthSession) -> Self {
        let email = auth.user.email.clone().unwrap_or_default();
        let username = auth
            .user
            .username_attribute()
            .map(str::to_string)
            .unwrap_or_else(|| default_username(&email));

        Self {
            user_id: auth.user.id.clone(),
            email,
            username,
            role: Role::from_claim(auth.user.role_claim()),
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at: auth.expires_at,
        }
    }

    /// Swaps in refreshed tokens; identity fields stay, the role claim is re-read.
    pub fn apply_refresh(&mut self, refreshed: &AuthSession) {
        self.access_token = refreshed.access_token.clone();
        self.refresh_token = refreshed.refresh_token.clone();
        self.expires_at = refreshed.expires_at;
        self.role = Role::from_claim(refreshed.user.role_claim());
    }

    pub fn needs_refresh(&self, now: i64, buffer_secs: i64) -> bool {
        self.expires_at - now < buffer_secs
    }
}

pub fn default_username(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "user".to_string(),
    }
}
