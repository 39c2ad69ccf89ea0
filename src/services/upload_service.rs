//! Three-phase direct upload.
//!
//! 1. `request_upload` hands the browser one signed URL per file.
//! 2. The browser pushes both files straight to storage.
//! 3. `finalize_upload` checks both objects landed, then writes the song row.

use chrono::Utc;
use futures::try_join;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, BackendError, ListOptions, TableQuery};
use crate::config::UploadConfig;
use crate::error::Result;
use crate::helpers::filename_helpers::{sanitize_filename, split_storage_path};
use crate::models::song::NewSong;
use crate::models::upload::{FinalizeRequest, FinalizedUpload, UploadRequest, UploadTicket};
use crate::validators::upload_validator::UploadValidator;
use crate::Error;

pub const AUDIO_FOLDER: &str = "audios";

pub struct UploadService;

impl UploadService {
    pub async fn request_upload(
        db: &dyn Backend,
        config: &UploadConfig,
        request: &UploadRequest,
    ) -> Result<UploadTicket> {
        UploadValidator::validate_request(request, config)?;

        let upload_id = Uuid::new_v4().to_string();
        let audio_path = Self::audio_path(&upload_id, &request.audio_filename);
        let cover_path = Self::cover_path(&upload_id, &request.cover_filename);
        let expires_in = config.signed_url_expiry_secs;

        let (audio, cover) = try_join!(
            db.create_signed_upload_url(&config.audio_bucket, &audio_path, expires_in),
            db.create_signed_upload_url(&config.cover_bucket, &cover_path, expires_in),
        )?;

        info!("issued upload {upload_id}: {audio_path} + {cover_path}");

        Ok(UploadTicket {
            success: true,
            upload_id,
            expires_in,
            audio,
            cover,
        })
    }

    pub fn audio_path(upload_id: &str, filename: &str) -> String {
        format!("{AUDIO_FOLDER}/{upload_id}_{}", sanitize_filename(filename))
    }

    pub fn cover_path(upload_id: &str, filename: &str) -> String {
        format!("{upload_id}_{}", sanitize_filename(filename))
    }

    /// Verifies both uploaded objects and records the song.
    ///
    /// Finalizing the same `upload_id` again returns the existing song with
    /// `created: false`.
    pub async fn finalize_upload(
        db: &dyn Backend,
        config: &UploadConfig,
        uploader_id: &str,
        request: &FinalizeRequest,
    ) -> Result<FinalizedUpload> {
        let upload_id = UploadValidator::validate_finalize(request)?;

        if let Some(song_id) = Self::song_for_upload(db, &upload_id).await? {
            debug!("upload {upload_id} already finalized as {song_id}");
            return Ok(FinalizedUpload {
                success: true,
                song_id,
                created: false,
            });
        }

        Self::verify_object(db, &config.audio_bucket, &request.audio_path).await?;
        Self::verify_object(db, &config.cover_bucket, &request.cover_path).await?;

        let song = NewSong {
            title: request.title.trim().to_string(),
            artist: request.artist.trim().to_string(),
            featured_artist: request
                .featured_artist
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            audio_url: db.public_url(&config.audio_bucket, &request.audio_path),
            cover_url: db.public_url(&config.cover_bucket, &request.cover_path),
            streams: 0,
            likes: 0,
            uploaded_by: uploader_id.to_string(),
            upload_id: upload_id.clone(),
            created_at: Utc::now(),
        };
        let row = serde_json::to_value(&song).map_err(BackendError::from)?;

        match db.insert("songs", row).await {
            Ok(inserted) => {
                let song_id = inserted
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Error::Backend("inserted song has no id".to_string()))?;
                info!("upload {upload_id} finalized as song {song_id}");

                Ok(FinalizedUpload {
                    success: true,
                    song_id,
                    created: true,
                })
            }
            Err(BackendError::Conflict(_)) => {
                warn!("upload {upload_id} finalized concurrently");
                let song_id = Self::song_for_upload(db, &upload_id)
                    .await?
                    .ok_or_else(|| Error::Backend(format!("no song for upload {upload_id}")))?;

                Ok(FinalizedUpload {
                    success: true,
                    song_id,
                    created: false,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn song_for_upload(db: &dyn Backend, upload_id: &str) -> Result<Option<String>> {
        let rows = db
            .select(
                "songs",
                &TableQuery::new()
                    .select("id")
                    .eq("upload_id", upload_id)
                    .limit(1),
            )
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Lists the object's folder and looks for its exact name.
    async fn verify_object(db: &dyn Backend, bucket: &str, path: &str) -> Result<()> {
        let (folder, name) = split_storage_path(path);
        let options = ListOptions {
            search: Some(name.to_string()),
            ..ListOptions::default()
        };

        let found = db
            .list_objects(bucket, folder, &options)
            .await?
            .iter()
            .any(|object| !object.is_folder() && object.name == name);

        if !found {
            warn!("upload verification failed: {bucket}/{path} not found");
            return Err(Error::UploadVerificationFailed {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}
