use serde::{Deserialize, Serialize};

use crate::models::song::Song;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// What the profile page shows.
#[derive(Debug, Serialize, Clone)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub liked_songs: Vec<Song>,
}
