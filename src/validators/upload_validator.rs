use uuid::Uuid;

use crate::config::UploadConfig;
use crate::models::upload::{FinalizeRequest, UploadRequest};
use crate::{Error, Result};

pub struct UploadValidator;

impl UploadValidator {
    /// Checks an upload request before any storage traffic happens.
    pub fn validate_request(request: &UploadRequest, config: &UploadConfig) -> Result<()> {
        Self::validate_file(
            "audio_filename",
            &request.audio_filename,
            "audio_size",
            request.audio_size,
            config.max_audio_bytes,
        )?;
        Self::validate_file(
            "cover_filename",
            &request.cover_filename,
            "cover_size",
            request.cover_size,
            config.max_cover_bytes,
        )
    }

    fn validate_file(
        name_field: &str,
        filename: &str,
        size_field: &str,
        size: u64,
        max_bytes: u64,
    ) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(Error::invalid(name_field, "is required"));
        }
        if size == 0 {
            return Err(Error::invalid(size_field, "file is empty"));
        }
        if size > max_bytes {
            return Err(Error::invalid(
                size_field,
                format!("file is larger than {} MB", max_bytes / (1024 * 1024)),
            ));
        }
        Ok(())
    }

    /// Checks a finalize request and returns the normalized correlation id.
    ///
    /// Both paths must be the keys request-upload issues for that id: the
    /// audio under `audios/{id}_` and the cover `{id}_` at the bucket root.
    pub fn validate_finalize(request: &FinalizeRequest) -> Result<String> {
        for (field, value) in [
            ("title", &request.title),
            ("artist", &request.artist),
            ("audio_path", &request.audio_path),
            ("cover_path", &request.cover_path),
            ("upload_id", &request.upload_id),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid(field, "is required"));
            }
        }

        let upload_id = Uuid::parse_str(request.upload_id.trim())
            .map_err(|_| Error::invalid("upload_id", "is not a valid upload id"))?
            .to_string();

        let audio_ok = request
            .audio_path
            .strip_prefix(&format!("audios/{upload_id}_"))
            .is_some_and(|name| !name.is_empty() && !name.contains('/'));
        if !audio_ok {
            return Err(Error::UploadVerificationFailed {
                path: request.audio_path.clone(),
            });
        }

        let cover_ok = request
            .cover_path
            .strip_prefix(&format!("{upload_id}_"))
            .is_some_and(|name| !name.is_empty() && !name.contains('/'));
        if !cover_ok {
            return Err(Error::UploadVerificationFailed {
                path: request.cover_path.clone(),
            });
        }

        Ok(upload_id)
    }
}
