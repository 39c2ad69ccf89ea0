use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Like {
    pub user_id: String,
    pub song_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LikeToggle {
    pub success: bool,
    pub liked: bool,
    pub likes: i64,
}
