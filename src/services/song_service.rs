use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{rows_into, select_all, Backend, TableQuery};
use crate::error::Result;
use crate::helpers::song_helpers::{parse_song_id, song_exists};
use crate::models::song::Song;
use crate::Error;

pub struct SongService;

impl SongService {
    /// Every song, newest first.
    pub async fn list_songs(db: &dyn Backend) -> Result<Vec<Song>> {
        let rows = select_all(db, "songs", &TableQuery::new().order_desc("created_at")).await?;
        Ok(rows_into(rows)?)
    }

    pub async fn get_song(db: &dyn Backend, song_id: &str) -> Result<Song> {
        let song_id = parse_song_id(song_id)?;
        let rows = db
            .select("songs", &TableQuery::new().eq("id", &song_id).limit(1))
            .await?;

        rows_into::<Song>(rows)?
            .into_iter()
            .next()
            .ok_or(Error::SongNotFound { id: song_id })
    }

    pub async fn songs_by_ids(db: &dyn Backend, ids: Vec<String>) -> Result<Vec<Song>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = db
            .select(
                "songs",
                &TableQuery::new().is_in("id", ids).order_desc("created_at"),
            )
            .await?;
        Ok(rows_into(rows)?)
    }

    /// Counts one play. Replays count too; there is no dedup.
    pub async fn stream_song(db: &dyn Backend, song_id: &str) -> Result<i64> {
        let song_id = parse_song_id(song_id)?;

        if !song_exists(db, &song_id).await? {
            return Err(Error::SongNotFound { id: song_id });
        }

        let streams = db
            .call_procedure("increment_song_streams", json!({ "p_song_id": song_id }))
            .await?;

        match Self::counter_value(&streams) {
            Some(streams) => Ok(streams),
            None => {
                debug!("increment_song_streams returned {streams}, re-reading song");
                Ok(Self::get_song(db, &song_id).await?.streams)
            }
        }
    }

    /// Counter procedures answer with the new value, bare or as a one-row set.
    pub fn counter_value(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::Array(rows) => rows.first().and_then(Self::counter_value),
            Value::Object(map) => map.values().next().and_then(Self::counter_value),
            _ => None,
        }
    }
}
