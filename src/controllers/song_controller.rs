use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::error::Result;
use crate::middlewares::mw_auth::Ctx;
use crate::models::like::LikeToggle;
use crate::models::song::StreamResult;
use crate::services::like_service::LikeService;
use crate::services::song_service::SongService;
use crate::AppState;

pub struct SongController;

impl SongController {
    pub async fn stream_song(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<StreamResult>> {
        let streams = SongService::stream_song(state.admin.as_ref(), &song_id).await?;

        Ok(Json(StreamResult {
            success: true,
            streams,
        }))
    }

    pub async fn toggle_like(
        State(state): State<AppState>,
        Extension(ctx): Extension<Ctx>,
        Path(song_id): Path<String>,
    ) -> Result<Json<LikeToggle>> {
        let toggle = LikeService::toggle_like(state.admin.as_ref(), &ctx.user_id, &song_id).await?;

        Ok(Json(toggle))
    }
}
