use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Song {
    pub id: String,

    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub featured_artist: Option<String>,

    pub audio_url: String,
    pub cover_url: String,

    // Stats
    #[serde(default)]
    pub streams: i64,
    #[serde(default)]
    pub likes: i64,

    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Song {
    /// Older rows store an empty string instead of null.
    pub fn featured(&self) -> Option<&str> {
        self.featured_artist
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// Row written by upload finalization.
#[derive(Debug, Serialize, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub featured_artist: Option<String>,
    pub audio_url: String,
    pub cover_url: String,
    pub streams: i64,
    pub likes: i64,
    pub uploaded_by: String,
    pub upload_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StreamResult {
    pub success: bool,
    pub streams: i64,
}
