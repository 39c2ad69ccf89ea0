//! Orphan sweep: deletes storage objects no song refers to.
//!
//! Abandoned uploads (request-upload without a finalize) leave objects behind.
//! An object is only deleted when it is unreferenced *and* older than the
//! grace period, so an upload still in flight is never touched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backend::{
    path_from_public_url, select_all, Backend, ListOptions, StorageObject, TableQuery,
};
use crate::config::{CleanupConfig, UploadConfig};
use crate::error::Result;
use crate::services::upload_service::AUDIO_FOLDER;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub scanned: usize,
    pub referenced: usize,
    pub skipped_recent: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl CleanupReport {
    fn absorb(&mut self, other: CleanupReport) {
        self.scanned += other.scanned;
        self.referenced += other.referenced;
        self.skipped_recent += other.skipped_recent;
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// Storage paths referenced by one URL column.
struct References {
    paths: HashSet<String>,
    /// URLs that did not map back to this bucket's public prefix.
    unmapped: Vec<String>,
}

impl References {
    fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
            || self
                .unmapped
                .iter()
                .any(|url| url.ends_with(&format!("/{path}")))
    }
}

pub struct CleanupService;

impl CleanupService {
    pub async fn sweep_orphans(
        db: &dyn Backend,
        config: &UploadConfig,
        grace_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        let songs = select_all(
            db,
            "songs",
            &TableQuery::new().select("id,audio_url,cover_url"),
        )
        .await?;

        let mut report = Self::sweep_bucket(
            db,
            &config.audio_bucket,
            AUDIO_FOLDER,
            &Self::references(db, &config.audio_bucket, &songs, "audio_url"),
            grace_secs,
            now,
        )
        .await?;

        report.absorb(
            Self::sweep_bucket(
                db,
                &config.cover_bucket,
                "",
                &Self::references(db, &config.cover_bucket, &songs, "cover_url"),
                grace_secs,
                now,
            )
            .await?,
        );

        info!("orphan sweep: {report:?}");
        Ok(report)
    }

    fn references(db: &dyn Backend, bucket: &str, songs: &[Value], column: &str) -> References {
        let mut references = References {
            paths: HashSet::new(),
            unmapped: Vec::new(),
        };

        for url in songs
            .iter()
            .filter_map(|song| song.get(column).and_then(Value::as_str))
            .filter(|url| !url.is_empty())
        {
            match path_from_public_url(db, bucket, url) {
                Some(path) => {
                    references.paths.insert(path);
                }
                None => references.unmapped.push(url.to_string()),
            }
        }
        references
    }

    async fn list_all(db: &dyn Backend, bucket: &str, folder: &str) -> Result<Vec<StorageObject>> {
        let mut objects = Vec::new();
        let mut offset = 0;

        loop {
            let options = ListOptions {
                search: None,
                limit: PAGE_SIZE,
                offset,
            };
            let page = db.list_objects(bucket, folder, &options).await?;
            let page_len = page.len();
            objects.extend(page);

            if page_len < PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        Ok(objects)
    }

    async fn sweep_bucket(
        db: &dyn Backend,
        bucket: &str,
        folder: &str,
        references: &References,
        grace_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for object in Self::list_all(db, bucket, folder).await? {
            if object.is_folder() {
                continue;
            }
            report.scanned += 1;

            let path = if folder.is_empty() {
                object.name.clone()
            } else {
                format!("{folder}/{}", object.name)
            };

            if references.contains(&path) {
                report.referenced += 1;
                continue;
            }

            // Without a timestamp the object's age is unknown; leave it.
            let old_enough = object
                .created_at
                .is_some_and(|created| (now - created).num_seconds() >= grace_secs);
            if !old_enough {
                report.skipped_recent += 1;
                continue;
            }

            match db.remove_objects(bucket, std::slice::from_ref(&path)).await {
                Ok(()) => {
                    info!("deleted orphan {bucket}/{path}");
                    report.deleted += 1;
                }
                Err(err) => {
                    warn!("could not delete orphan {bucket}/{path}: {err}");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Runs the sweep every `interval_secs` when configured.
    pub fn spawn_scheduled(
        db: Arc<dyn Backend>,
        upload: UploadConfig,
        cleanup: CleanupConfig,
    ) -> Option<JoinHandle<()>> {
        let interval_secs = cleanup.interval_secs.filter(|secs| *secs > 0)?;
        info!("orphan sweep scheduled every {interval_secs}s");

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // The first tick fires immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(err) =
                    Self::sweep_orphans(db.as_ref(), &upload, cleanup.grace_secs, Utc::now()).await
                {
                    error!("scheduled orphan sweep failed: {err}");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    const GRACE: i64 = 86_400;

    fn seed_song(db: &MemoryBackend, audio_path: &str, cover_path: &str) {
        db.seed_row(
            "songs",
            json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "title": "Song",
                "artist": "Artist",
                "audio_url": db.public_url("music", audio_path),
                "cover_url": db.public_url("covers", cover_path),
            }),
        );
    }

    #[tokio::test]
    async fn test_sweep_only_deletes_old_orphans() {
        let db = MemoryBackend::new();
        let config = UploadConfig::default();
        let now = Utc::now();
        let old = now - ChronoDuration::days(3);
        let young = now - ChronoDuration::hours(1);

        seed_song(&db, "audios/kept_song.mp3", "kept_cover.png");
        db.put_object("music", "audios/kept_song.mp3", old);
        db.put_object("covers", "kept_cover.png", old);
        db.put_object("music", "audios/orphan_song.mp3", old);
        db.put_object("covers", "orphan_cover.png", old);
        db.put_object("music", "audios/inflight_song.mp3", young);

        let report = CleanupService::sweep_orphans(&db, &config, GRACE, now)
            .await
            .unwrap();

        assert_eq!(
            report,
            CleanupReport {
                scanned: 5,
                referenced: 2,
                skipped_recent: 1,
                deleted: 2,
                failed: 0,
            }
        );
        assert_eq!(
            db.object_paths("music"),
            vec!["audios/inflight_song.mp3", "audios/kept_song.mp3"]
        );
        assert_eq!(db.object_paths("covers"), vec!["kept_cover.png"]);
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_abort_run() {
        let db = MemoryBackend::new();
        let config = UploadConfig::default();
        let now = Utc::now();
        let old = now - ChronoDuration::days(2);

        db.put_object("music", "audios/a.mp3", old);
        db.put_object("music", "audios/b.mp3", old);
        db.fail_removal_of("audios/a.mp3");

        let report = CleanupService::sweep_orphans(&db, &config, GRACE, now)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(db.object_paths("music"), vec!["audios/a.mp3"]);
        // One object per call.
        assert_eq!(db.count_calls("remove_objects:music:audios/a.mp3"), 1);
        assert_eq!(db.count_calls("remove_objects:music:audios/b.mp3"), 1);
    }

    #[tokio::test]
    async fn test_sweep_pages_through_large_listings() {
        let db = MemoryBackend::new();
        let config = UploadConfig::default();
        let now = Utc::now();
        let old = now - ChronoDuration::days(2);

        for i in 0..(PAGE_SIZE + 5) {
            db.put_object("music", &format!("audios/{i:04}.mp3"), old);
        }

        let report = CleanupService::sweep_orphans(&db, &config, GRACE, now)
            .await
            .unwrap();

        assert_eq!(report.scanned, PAGE_SIZE + 5);
        assert_eq!(report.deleted, PAGE_SIZE + 5);
        assert!(db.count_calls("list_objects:music:audios") >= 2);
    }

    #[tokio::test]
    async fn test_songs_past_the_row_cap_still_protect_objects() {
        let db = MemoryBackend::new();
        let config = UploadConfig::default();
        let now = Utc::now();
        let old = now - ChronoDuration::days(3);
        db.cap_selects(1000);

        for i in 0..1001 {
            let path = format!("audios/{i:04}.mp3");
            seed_song(&db, &path, "");
            db.put_object("music", &path, old);
        }

        let report = CleanupService::sweep_orphans(&db, &config, GRACE, now)
            .await
            .unwrap();

        assert_eq!(report.referenced, 1001);
        assert_eq!(report.deleted, 0);
        assert_eq!(db.object_paths("music").len(), 1001);
        assert!(db.count_calls("select:songs") >= 2);
    }

    #[tokio::test]
    async fn test_legacy_urls_still_protect_objects() {
        let db = MemoryBackend::new();
        let config = UploadConfig::default();
        let now = Utc::now();
        db.seed_row(
            "songs",
            json!({
                "id": "legacy",
                "audio_url": "https://old-cdn.example/music/audios/legacy.mp3",
                "cover_url": "",
            }),
        );
        db.put_object("music", "audios/legacy.mp3", now - ChronoDuration::days(30));

        let report = CleanupService::sweep_orphans(&db, &config, GRACE, now)
            .await
            .unwrap();

        assert_eq!(report.referenced, 1);
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn test_no_schedule_without_interval() {
        let db: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let cleanup = CleanupConfig {
            grace_secs: GRACE,
            interval_secs: None,
        };

        assert!(CleanupService::spawn_scheduled(db, UploadConfig::default(), cleanup).is_none());
    }
}
