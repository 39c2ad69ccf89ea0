use std::collections::HashSet;

use serde_json::json;
use tracing::debug;

use crate::backend::{rows_into, Backend, BackendError, Filter, TableQuery};
use crate::error::Result;
use crate::helpers::song_helpers::{parse_song_id, song_exists};
use crate::models::like::{Like, LikeToggle};
use crate::services::song_service::SongService;
use crate::Error;

pub struct LikeService;

impl LikeService {
    pub async fn liked_song_ids(db: &dyn Backend, user_id: &str) -> Result<HashSet<String>> {
        let rows = db
            .select(
                "likes",
                &TableQuery::new().select("user_id,song_id").eq("user_id", user_id),
            )
            .await?;

        Ok(rows_into::<Like>(rows)?
            .into_iter()
            .map(|like| like.song_id)
            .collect())
    }

    /// Flips the caller's like on a song and moves the counter with it.
    ///
    /// The counter only moves when this call actually inserted or removed the
    /// like row, so a toggle that loses a race leaves the counter alone.
    pub async fn toggle_like(db: &dyn Backend, user_id: &str, song_id: &str) -> Result<LikeToggle> {
        let song_id = parse_song_id(song_id)?;

        if !song_exists(db, &song_id).await? {
            return Err(Error::SongNotFound { id: song_id });
        }

        let existing = db
            .select(
                "likes",
                &TableQuery::new()
                    .eq("user_id", user_id)
                    .eq("song_id", &song_id)
                    .limit(1),
            )
            .await?;

        let liked = if existing.is_empty() {
            match db
                .insert("likes", json!({ "user_id": user_id, "song_id": song_id }))
                .await
            {
                Ok(_) => {
                    Self::adjust_likes(db, &song_id, 1).await?;
                    true
                }
                // Someone else's toggle inserted the same row first.
                Err(BackendError::Conflict(_)) => {
                    debug!("like by {user_id} on {song_id} already present");
                    true
                }
                Err(err) => return Err(err.into()),
            }
        } else {
            Self::remove_like(db, user_id, &song_id).await?;
            false
        };

        let song = SongService::get_song(db, &song_id).await?;

        Ok(LikeToggle {
            success: true,
            liked,
            likes: song.likes,
        })
    }

    /// Deletes the like row and decrements the counter if a row was removed.
    async fn remove_like(db: &dyn Backend, user_id: &str, song_id: &str) -> Result<bool> {
        let removed = db
            .delete(
                "likes",
                &[
                    Filter::Eq("user_id".to_string(), user_id.to_string()),
                    Filter::Eq("song_id".to_string(), song_id.to_string()),
                ],
            )
            .await?;

        if removed == 0 {
            debug!("like by {user_id} on {song_id} already removed");
            return Ok(false);
        }
        Self::adjust_likes(db, song_id, -1).await?;
        Ok(true)
    }

    async fn adjust_likes(db: &dyn Backend, song_id: &str, delta: i64) -> Result<()> {
        db.call_procedure(
            "adjust_song_likes",
            json!({ "p_song_id": song_id, "p_delta": delta }),
        )
        .await?;
        Ok(())
    }
}
