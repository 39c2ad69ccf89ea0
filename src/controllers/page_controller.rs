use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Extension;
use serde::Deserialize;

use crate::error::PageResult;
use crate::middlewares::mw_auth::Ctx;
use crate::services::admin_service::AdminService;
use crate::services::like_service::LikeService;
use crate::services::profile_service::ProfileService;
use crate::services::search_service::SearchService;
use crate::services::song_service::SongService;
use crate::views::pages::{self, Flash};
use crate::{AppState, Error, Result};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub struct PageController;

impl PageController {
    async fn liked_ids(state: &AppState, ctx: Option<&Ctx>) -> Result<HashSet<String>> {
        match ctx {
            Some(ctx) => LikeService::liked_song_ids(state.admin.as_ref(), &ctx.user_id).await,
            None => Ok(HashSet::new()),
        }
    }

    pub async fn index(
        State(state): State<AppState>,
        ctx: Option<Extension<Ctx>>,
    ) -> PageResult<Html<String>> {
        let ctx = ctx.map(|Extension(ctx)| ctx);
        let songs = SongService::list_songs(state.backend.as_ref()).await?;
        let liked = Self::liked_ids(&state, ctx.as_ref()).await?;

        Ok(pages::index_page(ctx.as_ref(), &songs, &liked))
    }

    pub async fn search(
        State(state): State<AppState>,
        ctx: Option<Extension<Ctx>>,
        Query(query): Query<SearchQuery>,
    ) -> PageResult<Response> {
        let ctx = ctx.map(|Extension(ctx)| ctx);

        let result = match SearchService::search_songs(state.backend.as_ref(), &query.q).await {
            Ok(result) => result,
            Err(err @ Error::InvalidInput { .. }) => {
                let page = pages::search_page(
                    ctx.as_ref(),
                    "",
                    &[],
                    &HashSet::new(),
                    Some(Flash::Error(&err.client_message())),
                );
                return Ok((StatusCode::BAD_REQUEST, page).into_response());
            }
            Err(err) => return Err(err.into()),
        };
        let liked = Self::liked_ids(&state, ctx.as_ref()).await?;

        Ok(pages::search_page(ctx.as_ref(), &result.query, &result.songs, &liked, None).into_response())
    }

    pub async fn profile(
        State(state): State<AppState>,
        Extension(ctx): Extension<Ctx>,
    ) -> PageResult<Html<String>> {
        let overview = ProfileService::profile_overview(state.admin.as_ref(), &ctx).await?;
        Ok(pages::profile_page(&ctx, &overview))
    }

    pub async fn admin(
        State(state): State<AppState>,
        Extension(ctx): Extension<Ctx>,
    ) -> PageResult<Html<String>> {
        let dashboard = AdminService::dashboard(state.admin.as_ref()).await?;
        Ok(pages::admin_page(&ctx, &dashboard))
    }

    pub async fn upload(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> Html<String> {
        pages::upload_page(&ctx, &state.config.upload)
    }

    pub async fn not_found() -> impl IntoResponse {
        (
            StatusCode::NOT_FOUND,
            pages::error_page(StatusCode::NOT_FOUND, "This page does not exist."),
        )
    }
}
