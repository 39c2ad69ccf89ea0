use axum::{routing::get, Router};

use crate::{controllers::auth_controller::AuthController, AppState};

pub struct AuthRoutes;

impl AuthRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route(
                "/signup",
                get(AuthController::signup_form).post(AuthController::signup),
            )
            .route(
                "/login",
                get(AuthController::login_form).post(AuthController::login),
            )
            .route("/logout", get(AuthController::logout))
            .route(
                "/forgot-password",
                get(AuthController::forgot_password_form).post(AuthController::forgot_password),
            )
    }
}
