use axum::{middleware, Router};
use tower_cookies::CookieManagerLayer;
use tower_http::services::ServeDir;

use crate::{
    controllers::page_controller::PageController,
    middlewares::{mw_rate_limit::rate_limit_middleware, mw_session::mw_session},
    AppState,
};

pub mod auth_routes;
pub mod page_routes;
pub mod song_routes;
pub mod upload_routes;

use auth_routes::AuthRoutes;
use page_routes::PageRoutes;
use song_routes::SongRoutes;
use upload_routes::UploadRoutes;

/// The cookie jar wraps everything; session handling runs next so the rate
/// limiter can key on the user.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .merge(PageRoutes::routes())
        .merge(AuthRoutes::routes())
        .merge(SongRoutes::routes())
        .nest("/api", UploadRoutes::routes())
        .nest_service("/static", ServeDir::new(&app_state.config.static_dir))
        .fallback(PageController::not_found)
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(app_state.clone(), mw_session))
        .layer(CookieManagerLayer::new())
        .with_state(app_state)
}
