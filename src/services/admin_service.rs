use futures::try_join;
use serde_json::{json, Value};

use crate::backend::{Backend, BackendError};
use crate::error::{Error, Result};
use crate::models::dashboard::{Dashboard, DashboardStats};
use crate::services::song_service::SongService;

pub struct AdminService;

impl AdminService {
    pub async fn dashboard(db: &dyn Backend) -> Result<Dashboard> {
        let (totals, songs) = try_join!(
            async {
                db.call_procedure("dashboard_totals", json!({}))
                    .await
                    .map_err(Error::from)
            },
            SongService::list_songs(db),
        )?;

        let stats = Self::stats_from(totals)?;
        Ok(Dashboard { stats, songs })
    }

    /// Set-returning procedures answer with a one-row array.
    fn stats_from(totals: Value) -> Result<DashboardStats> {
        let row = match totals {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Array(_) => Value::Null,
            row => row,
        };
        if row.is_null() {
            let err = BackendError::Decode("dashboard_totals returned no row".to_string());
            return Err(err.into());
        }

        Ok(serde_json::from_value(row).map_err(BackendError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_dashboard_totals() {
        let db = MemoryBackend::new();
        db.seed_row("profiles", json!({ "id": "u1", "username": "a" }));
        db.seed_row("profiles", json!({ "id": "u2", "username": "b" }));
        for (streams, likes) in [(10, 2), (5, 1)] {
            db.seed_row(
                "songs",
                json!({
                    "id": uuid::Uuid::new_v4().to_string(),
                    "title": "Song",
                    "artist": "A",
                    "audio_url": "a",
                    "cover_url": "c",
                    "streams": streams,
                    "likes": likes,
                }),
            );
        }

        let dashboard = AdminService::dashboard(&db).await.unwrap();

        assert_eq!(
            dashboard.stats,
            DashboardStats {
                users_count: 2,
                songs_count: 2,
                total_streams: 15,
                total_likes: 3,
            }
        );
        assert_eq!(dashboard.songs.len(), 2);
    }

    #[tokio::test]
    async fn test_dashboard_counts_past_the_row_cap() {
        let db = MemoryBackend::new();
        db.cap_selects(3);
        for i in 0..5 {
            db.seed_row("profiles", json!({ "id": format!("u{i}"), "username": "a" }));
        }
        for i in 0..7 {
            db.seed_row(
                "songs",
                json!({
                    "id": format!("00000000-0000-0000-0000-00000000000{i}"),
                    "title": "Song",
                    "artist": "A",
                    "audio_url": "a",
                    "cover_url": "c",
                    "streams": 2,
                    "likes": 1,
                    "created_at": format!("2024-01-0{}T00:00:00Z", i + 1),
                }),
            );
        }

        let dashboard = AdminService::dashboard(&db).await.unwrap();

        assert_eq!(
            dashboard.stats,
            DashboardStats {
                users_count: 5,
                songs_count: 7,
                total_streams: 14,
                total_likes: 7,
            }
        );
        assert_eq!(dashboard.songs.len(), 7);
        assert_eq!(db.count_calls("rpc:dashboard_totals"), 1);
    }
}
