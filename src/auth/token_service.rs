use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::models::UserSession;
use crate::config::SessionConfig;
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // subject (user_id)
    pub exp: usize,  // cookie expiration, not the access token's
    pub iat: usize,  // issued at
    pub iss: String, // issuer
    pub aud: String, // audience
    pub jti: String, // jtw id
    pub session: UserSession,
}

impl SessionClaims {
    pub fn new(session: UserSession, config: &SessionConfig) -> Self {
        let iat = Utc::now();
        let exp = iat + Duration::days(config.ttl_days);

        Self {
            sub: session.user_id.clone(),
            exp: exp.timestamp() as usize,
            iat: iat.timestamp() as usize,
            iss: config.issuer.clone(),
            aud: config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            session,
        }
    }
}

/// Signs and verifies the client-held session cookie.
pub struct TokenService;

impl TokenService {
    pub fn create_token(session: &UserSession, config: &SessionConfig) -> Result<String> {
        let claims = SessionClaims::new(session.clone(), config);
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret_key.as_bytes()),
        )
        .map_err(|_| Error::SessionEncodeFail)
    }

    pub fn validate_token(token: &str, config: &SessionConfig) -> Result<UserSession> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.issuer.as_str()]);
        validation.set_issuer(&[config.issuer.as_str()]);

        let decoded = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(config.secret_key.as_bytes()),
            &validation,
        )?;
        Ok(decoded.claims.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::config::AppConfig;

    fn session() -> UserSession {
        UserSession {
            user_id: "user123".to_string(),
            email: "user@example.com".to_string(),
            username: "user".to_string(),
            role: Role::User,
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_create_and_validate_token() {
        let config = AppConfig::for_tests().session;
        let token = TokenService::create_token(&session(), &config).unwrap();
        assert!(!token.is_empty());

        let decoded = TokenService::validate_token(&token, &config).unwrap();
        assert_eq!(decoded, session());
    }

    #[test]
    fn test_token_signed_with_other_key_is_rejected() {
        let config = AppConfig::for_tests().session;
        let mut other = config.clone();
        other.secret_key = "another-secret".to_string();

        let token = TokenService::create_token(&session(), &other).unwrap();
        assert!(matches!(
            TokenService::validate_token(&token, &config),
            Err(Error::SessionInvalid)
        ));
    }
}
