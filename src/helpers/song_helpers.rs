use uuid::Uuid;

use crate::backend::{Backend, TableQuery};
use crate::{Error, Result};

/// Song ids are UUIDs; anything else cannot name a song.
pub fn parse_song_id(song_id: &str) -> Result<String> {
    Uuid::parse_str(song_id.trim())
        .map(|id| id.to_string())
        .map_err(|_| Error::SongNotFound {
            id: song_id.to_string(),
        })
}

pub async fn song_exists(db: &dyn Backend, song_id: &str) -> Result<bool> {
    let rows = db
        .select("songs", &TableQuery::new().select("id").eq("id", song_id).limit(1))
        .await?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_song_exists() {
        let db = MemoryBackend::new();
        let valid_id = Uuid::new_v4().to_string();
        db.seed_row("songs", json!({ "id": valid_id, "title": "Titre" }));

        // --- Test 1: Verify that an existing song is detected ---
        let exists = song_exists(&db, &valid_id).await.unwrap();
        assert!(exists, "Song with ID '{}' should exist", valid_id);

        // --- Test 2: Verify that a valid but non-existent ID is detected ---
        let non_existent_id = Uuid::new_v4().to_string();
        let exists = song_exists(&db, &non_existent_id).await.unwrap();
        assert!(!exists, "Song with a non-existent ID should not exist");
    }

    #[tokio::test]
    async fn test_parse_song_id() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(parse_song_id(&id).unwrap(), id);
        assert!(matches!(
            parse_song_id("just_a_random_string"),
            Err(Error::SongNotFound { .. })
        ));
    }
}
