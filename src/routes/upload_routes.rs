use axum::{middleware, routing::post, Router};

use crate::{
    controllers::upload_controller::UploadController, middlewares::mw_auth::mw_require_admin,
    AppState,
};

pub struct UploadRoutes;

impl UploadRoutes {
    pub fn routes() -> Router<AppState> {
        Router::new()
            .route("/request-upload", post(UploadController::request_upload))
            .route("/finalize-upload", post(UploadController::finalize_upload))
            .route_layer(middleware::from_fn(mw_require_admin))
    }
}
