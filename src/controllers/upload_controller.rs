use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use crate::error::Result;
use crate::middlewares::mw_auth::Ctx;
use crate::models::upload::{FinalizeRequest, FinalizedUpload, UploadRequest, UploadTicket};
use crate::services::upload_service::UploadService;
use crate::AppState;

pub struct UploadController;

impl UploadController {
    pub async fn request_upload(
        State(state): State<AppState>,
        payload: core::result::Result<Json<UploadRequest>, JsonRejection>,
    ) -> Result<Json<UploadTicket>> {
        let Json(request) = payload?;
        let ticket =
            UploadService::request_upload(state.admin.as_ref(), &state.config.upload, &request)
                .await?;

        Ok(Json(ticket))
    }

    pub async fn finalize_upload(
        State(state): State<AppState>,
        Extension(ctx): Extension<Ctx>,
        payload: core::result::Result<Json<FinalizeRequest>, JsonRejection>,
    ) -> Result<Json<FinalizedUpload>> {
        let Json(request) = payload?;
        let finalized = UploadService::finalize_upload(
            state.admin.as_ref(),
            &state.config.upload,
            &ctx.user_id,
            &request,
        )
        .await?;

        Ok(Json(finalized))
    }
}
