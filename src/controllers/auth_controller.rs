use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use tower_cookies::Cookies;

use crate::auth::cookies::{removal_cookie, session_cookie};
use crate::auth::models::{ForgotPasswordPayload, LoginPayload, SignupPayload, UserSession};
use crate::auth::token_service::TokenService;
use crate::error::{PageResult, Result};
use crate::middlewares::mw_auth::Ctx;
use crate::services::auth_service::{AuthService, SignupOutcome};
use crate::views::pages::{self, Flash};
use crate::{AppState, Error};

const RESET_NOTICE: &str =
    "If an account exists for this email, password reset instructions are on their way.";

pub struct AuthController;

impl AuthController {
    /// Stores the session in the cookie and sends the browser home.
    fn signed_in(state: &AppState, cookies: &Cookies, session: &UserSession) -> Result<Response> {
        let token = TokenService::create_token(session, &state.config.session)?;
        cookies.add(session_cookie(token, &state.config.session));

        Ok(Redirect::to("/").into_response())
    }

    pub async fn signup_form(ctx: Option<Extension<Ctx>>) -> Response {
        if ctx.is_some() {
            return Redirect::to("/").into_response();
        }
        pages::signup_page("", "", None).into_response()
    }

    pub async fn signup(
        State(state): State<AppState>,
        cookies: Cookies,
        Form(payload): Form<SignupPayload>,
    ) -> PageResult<Response> {
        match AuthService::register_user(state.backend.as_ref(), state.admin.as_ref(), &payload)
            .await
        {
            Ok(SignupOutcome::SignedIn(session)) => Ok(Self::signed_in(&state, &cookies, &session)?),
            Ok(SignupOutcome::ConfirmEmail) => Ok(pages::login_page(
                payload.email.trim(),
                Some(Flash::Notice(
                    "Account created. Confirm your email, then log in.",
                )),
            )
            .into_response()),
            Err(err @ Error::InvalidInput { .. }) => Ok((
                StatusCode::BAD_REQUEST,
                pages::signup_page(
                    &payload.email,
                    &payload.username,
                    Some(Flash::Error(&err.client_message())),
                ),
            )
                .into_response()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login_form(ctx: Option<Extension<Ctx>>) -> Response {
        if ctx.is_some() {
            return Redirect::to("/").into_response();
        }
        pages::login_page("", None).into_response()
    }

    pub async fn login(
        State(state): State<AppState>,
        cookies: Cookies,
        Form(payload): Form<LoginPayload>,
    ) -> PageResult<Response> {
        match AuthService::login_user(state.backend.as_ref(), &payload).await {
            Ok(session) => Ok(Self::signed_in(&state, &cookies, &session)?),
            Err(err @ (Error::LoginFail | Error::InvalidInput { .. })) => Ok((
                err.client_status_and_error().0,
                pages::login_page(&payload.email, Some(Flash::Error(&err.client_message()))),
            )
                .into_response()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn logout(
        State(state): State<AppState>,
        cookies: Cookies,
        ctx: Option<Extension<Ctx>>,
    ) -> Redirect {
        if let Some(Extension(ctx)) = ctx {
            AuthService::logout_user(state.backend.as_ref(), &ctx.access_token).await;
        }

        cookies.remove(removal_cookie());
        Redirect::to("/")
    }

    pub async fn forgot_password_form() -> Html<String> {
        pages::forgot_password_page(None)
    }

    pub async fn forgot_password(
        State(state): State<AppState>,
        Form(payload): Form<ForgotPasswordPayload>,
    ) -> Response {
        let redirect_to = format!("{}/login", state.config.app_url.trim_end_matches('/'));

        match AuthService::forgot_password(state.backend.as_ref(), &payload.email, &redirect_to)
            .await
        {
            Ok(()) => pages::forgot_password_page(Some(Flash::Notice(RESET_NOTICE))).into_response(),
            Err(err) => (
                StatusCode::BAD_REQUEST,
                pages::forgot_password_page(Some(Flash::Error(&err.client_message()))),
            )
                .into_response(),
        }
    }
}
