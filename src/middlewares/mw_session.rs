//! Session/token manager.
//!
//! Runs once per request before any handler: decodes the signed session
//! cookie, refreshes the access token when it is about to expire, and hands
//! the identity to handlers as a [`Ctx`] request extension.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use tower_cookies::Cookies;
use tracing::{debug, error, warn};

use crate::auth::cookies::{read_session_token, removal_cookie, session_cookie};
use crate::auth::models::UserSession;
use crate::auth::token_service::TokenService;
use crate::config::SessionConfig;
use crate::middlewares::mw_auth::Ctx;
use crate::AppState;

/// Paths that stay reachable after a failed refresh.
const EXEMPT_PATHS: &[&str] = &["/", "/login", "/signup"];

pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || path.starts_with("/static/")
}

/// Cookie changes are queued on the jar before the handler runs, so a handler
/// that sets or removes the session itself (login, logout) overrides them.
pub async fn mw_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.config.session;

    let session = match read_session_token(&cookies) {
        Some(token) => match TokenService::validate_token(&token, config) {
            Ok(session) => Some(session),
            Err(_) => {
                debug!("discarding session cookie that failed validation");
                cookies.remove(removal_cookie());
                None
            }
        },
        None => None,
    };

    let mut refresh_failed = false;
    let session = match session {
        Some(mut session)
            if session.needs_refresh(Utc::now().timestamp(), config.refresh_buffer_secs) =>
        {
            match state.backend.refresh_session(&session.refresh_token).await {
                Ok(refreshed) => {
                    debug!("refreshed session for user {}", session.user_id);
                    session.apply_refresh(&refreshed);
                    store_session(&cookies, &session, config);
                    Some(session)
                }
                Err(err) => {
                    warn!("session refresh failed for user {}: {}", session.user_id, err);
                    cookies.remove(removal_cookie());
                    refresh_failed = true;
                    None
                }
            }
        }
        other => other,
    };

    if refresh_failed && !is_exempt(req.uri().path()) {
        return Redirect::to("/login").into_response();
    }

    if let Some(session) = &session {
        req.extensions_mut().insert(Ctx::from_session(session));
    }

    next.run(req).await
}

fn store_session(cookies: &Cookies, session: &UserSession, config: &SessionConfig) {
    match TokenService::create_token(session, config) {
        Ok(token) => cookies.add(session_cookie(token, config)),
        Err(err) => error!("could not re-sign session cookie: {err}"),
    }
}
