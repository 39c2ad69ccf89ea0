use axum::{middleware, routing::get, Router};

use crate::{
    controllers::page_controller::PageController,
    middlewares::mw_auth::{mw_page_require_admin, mw_page_require_auth},
    AppState,
};

pub struct PageRoutes;

impl PageRoutes {
    pub fn routes() -> Router<AppState> {
        let public = Router::new()
            .route("/", get(PageController::index))
            .route("/search", get(PageController::search));

        let signed_in = Router::new()
            .route("/profile", get(PageController::profile))
            .route_layer(middleware::from_fn(mw_page_require_auth));

        let admin = Router::new()
            .route("/admin", get(PageController::admin))
            .route("/upload", get(PageController::upload))
            .route_layer(middleware::from_fn(mw_page_require_admin));

        public.merge(signed_in).merge(admin)
    }
}
