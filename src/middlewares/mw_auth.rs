use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::auth::models::{Role, UserSession};
use crate::error::{Error, Result};

/// Request-scoped identity, inserted by the session middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ctx {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub access_token: String,
}

impl Ctx {
    pub fn from_session(session: &UserSession) -> Self {
        Self {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            username: session.username.clone(),
            role: session.role,
            access_token: session.access_token.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub async fn mw_require_auth(req: Request<Body>, next: Next) -> Result<Response> {
    req.extensions()
        .get::<Ctx>()
        .ok_or(Error::Unauthenticated)?;

    Ok(next.run(req).await)
}

pub async fn mw_require_admin(req: Request<Body>, next: Next) -> Result<Response> {
    let ctx = req
        .extensions()
        .get::<Ctx>()
        .ok_or(Error::Unauthenticated)?;

    if !ctx.is_admin() {
        tracing::warn!("user {} denied admin route {}", ctx.user_id, req.uri().path());
        return Err(Error::Forbidden);
    }

    Ok(next.run(req).await)
}

/// Browser pages send anonymous visitors to the login form instead of a 401.
pub async fn mw_page_require_auth(req: Request<Body>, next: Next) -> Response {
    if req.extensions().get::<Ctx>().is_none() {
        return Redirect::to("/login").into_response();
    }

    next.run(req).await
}

pub async fn mw_page_require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<Ctx>() {
        Some(ctx) if ctx.is_admin() => next.run(req).await,
        Some(_) => Redirect::to("/").into_response(),
        None => Redirect::to("/login").into_response(),
    }
}
