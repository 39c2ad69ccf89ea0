use serde::{Deserialize, Serialize};

use crate::models::song::Song;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub users_count: usize,
    pub songs_count: usize,
    pub total_streams: i64,
    pub total_likes: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub songs: Vec<Song>,
}
