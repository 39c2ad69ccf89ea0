use serde::{Deserialize, Serialize};

use crate::backend::SignedUpload;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct UploadRequest {
    #[serde(default)]
    pub audio_filename: String,
    #[serde(default)]
    pub audio_size: u64,
    #[serde(default)]
    pub cover_filename: String,
    #[serde(default)]
    pub cover_size: u64,
}

/// Everything the browser needs to push both files straight to storage.
#[derive(Debug, Serialize, Clone)]
pub struct UploadTicket {
    pub success: bool,
    pub upload_id: String,
    pub expires_in: u64,
    pub audio: SignedUpload,
    pub cover: SignedUpload,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub featured_artist: Option<String>,
    #[serde(default)]
    pub audio_path: String,
    #[serde(default)]
    pub cover_path: String,
    #[serde(default)]
    pub upload_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FinalizedUpload {
    pub success: bool,
    pub song_id: String,
    /// `false` when this correlation id had already been finalized.
    pub created: bool,
}
