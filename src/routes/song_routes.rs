use axum::{middleware, routing::post, Router};
use tower_http::cors::CorsLayer;

use crate::{
    controllers::song_controller::SongController, middlewares::mw_auth::mw_require_auth,
    AppState,
};

pub struct SongRoutes;

impl SongRoutes {
    pub fn routes() -> Router<AppState> {
        // Players embedded on other origins report plays too.
        let stream = Router::new()
            .route("/stream/{song_id}", post(SongController::stream_song))
            .route_layer(CorsLayer::permissive());

        let like = Router::new()
            .route("/like/{song_id}", post(SongController::toggle_like))
            .route_layer(middleware::from_fn(mw_require_auth));

        stream.merge(like)
    }
}
