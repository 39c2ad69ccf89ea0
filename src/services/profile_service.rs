use serde_json::json;
use tracing::debug;

use crate::backend::{rows_into, Backend, BackendError, TableQuery};
use crate::error::Result;
use crate::middlewares::mw_auth::Ctx;
use crate::models::profile::{Profile, ProfileOverview};
use crate::services::like_service::LikeService;
use crate::services::song_service::SongService;

pub struct ProfileService;

impl ProfileService {
    /// Reads the caller's profile, creating it if sign-up never did.
    pub async fn get_or_create_profile(db: &dyn Backend, ctx: &Ctx) -> Result<Profile> {
        if let Some(profile) = Self::find_profile(db, &ctx.user_id).await? {
            return Ok(profile);
        }

        let profile = Profile {
            id: ctx.user_id.clone(),
            username: ctx.username.clone(),
            email: Some(ctx.email.clone()).filter(|e| !e.is_empty()),
        };
        debug!("creating missing profile for {}", ctx.user_id);

        match db.insert("profiles", json!(profile)).await {
            Ok(_) => Ok(profile),
            Err(BackendError::Conflict(_)) => Ok(Self::find_profile(db, &ctx.user_id)
                .await?
                .unwrap_or(profile)),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_profile(db: &dyn Backend, user_id: &str) -> Result<Option<Profile>> {
        let rows = db
            .select("profiles", &TableQuery::new().eq("id", user_id).limit(1))
            .await?;
        Ok(rows_into::<Profile>(rows)?.into_iter().next())
    }

    pub async fn profile_overview(db: &dyn Backend, ctx: &Ctx) -> Result<ProfileOverview> {
        let profile = Self::get_or_create_profile(db, ctx).await?;
        let liked_ids = LikeService::liked_song_ids(db, &ctx.user_id).await?;
        let liked_songs = SongService::songs_by_ids(db, liked_ids.into_iter().collect()).await?;

        Ok(ProfileOverview {
            profile,
            liked_songs,
        })
    }
}
