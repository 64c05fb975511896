use chrono::Utc;
use futures_util::future::join_all;
use rand::Rng;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::local_store::ReportLog;
use crate::models::{IssueReport, ValidationResult, Video};
use crate::ttl_cache::{CacheStats, TtlCache};
use crate::video_catalog;
use crate::youtube::VideoStatusChecker;

use crate::{log_performance, log_validation};

pub const ERROR_INVALID_URL: &str = "invalid URL";
pub const ERROR_REPORTED: &str = "reported as unavailable";
pub const ERROR_UNAVAILABLE: &str = "video unavailable";
pub const ERROR_NOT_FOUND: &str = "video not found";
pub const ERROR_CHECK_FAILED: &str = "could not check video status";

pub const VALIDATION_CACHE_MINUTES: i64 = 30;

const EMBED_BASE: &str = "https://www.youtube.com/embed";
const PLAYLIST_EMBED_MARKER: &str = "videoseries";

struct UrlPatterns {
    playlist_page: Regex,
    playlist_param: Regex,
    video_id: Regex,
    embed_id: Regex,
}

fn patterns() -> &'static UrlPatterns {
    static PATTERNS: OnceLock<UrlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| UrlPatterns {
        playlist_page: Regex::new(r"youtube\.com/playlist\?list=([a-zA-Z0-9_-]+)").expect("playlist page regex is valid"),
        playlist_param: Regex::new(r"[?&]list=([a-zA-Z0-9_-]+)").expect("playlist param regex is valid"),
        video_id: Regex::new(
            r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/\n\s]+/\S+/|(?:v|e(?:mbed)?)/|\S*?[?&]v=)|youtu\.be/)([a-zA-Z0-9_-]{11})",
        )
        .expect("video id regex is valid"),
        embed_id: Regex::new(r"embed/([a-zA-Z0-9_-]{11})").expect("embed id regex is valid"),
    })
}

fn capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn playlist_embed(list: &str) -> String {
    format!("{}/{}?list={}", EMBED_BASE, PLAYLIST_EMBED_MARKER, list)
}

/// Embeddable URL for a YouTube watch, short, embed or playlist URL
pub fn youtube_embed_url(url: &str) -> Option<String> {
    let patterns = patterns();

    if let Some(list) = capture(&patterns.playlist_page, url) {
        return Some(playlist_embed(&list));
    }

    let playlist = capture(&patterns.playlist_param, url);

    if url.contains("v=videoseries") {
        if let Some(list) = &playlist {
            return Some(playlist_embed(list));
        }
    }

    match (extract_video_id(url), playlist) {
        (Some(id), Some(list)) => Some(format!("{}/{}?list={}", EMBED_BASE, id, list)),
        (Some(id), None) => Some(format!("{}/{}", EMBED_BASE, id)),
        (None, Some(list)) => Some(playlist_embed(&list)),
        (None, None) => None,
    }
}

/// The 11-character video id, never the `videoseries` playlist marker
pub fn extract_video_id(url: &str) -> Option<String> {
    capture(&patterns().video_id, url).filter(|id| id != PLAYLIST_EMBED_MARKER)
}

fn embed_video_id(embed_url: &str) -> Option<String> {
    capture(&patterns().embed_id, embed_url).filter(|id| id != PLAYLIST_EMBED_MARKER)
}

/// Decides whether a video can be embedded, caching each verdict per video id
#[derive(Clone)]
pub struct VideoValidator {
    cache: TtlCache<String, ValidationResult>,
    reports: ReportLog,
    status_checker: Option<Arc<dyn VideoStatusChecker>>,
    synthetic_failure_rate: f64,
    /// Bumped on every report and cache clear; a check that started under an
    /// older generation must not be cached
    generation: Arc<AtomicU64>,
}

impl VideoValidator {
    pub fn new(reports: ReportLog, status_checker: Option<Arc<dyn VideoStatusChecker>>) -> Self {
        Self {
            cache: TtlCache::with_minutes("video_validation", VALIDATION_CACHE_MINUTES),
            reports,
            status_checker,
            synthetic_failure_rate: 0.0,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Probability that an unverifiable single video is reported as unavailable
    pub fn with_synthetic_failure_rate(mut self, rate: f64) -> Self {
        self.synthetic_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn reports(&self) -> &ReportLog {
        &self.reports
    }

    pub async fn validate(&self, video: &Video) -> ValidationResult {
        if let Some(cached) = self.cache.get(&video.id).await {
            return cached;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let mut result = self.check(video).await;

        let superseded = self.generation.load(Ordering::SeqCst) != generation;
        if superseded && result.playable && self.is_reported(video).await {
            result = ValidationResult::unplayable(ERROR_REPORTED);
        }

        if !result.playable {
            log_validation!(
                failure,
                "video_validator",
                video_id = video.id,
                error = result.error.as_deref().unwrap_or_default()
            );
        }

        if superseded {
            debug!(video_id = %video.id, "Report arrived during validation, verdict not cached");
        } else {
            self.cache.set(video.id.clone(), result.clone()).await;
            if self.generation.load(Ordering::SeqCst) != generation {
                self.cache.evict(&video.id).await;
            }
        }
        result
    }

    async fn is_reported(&self, video: &Video) -> bool {
        let problematic = self.reports.problematic_ids().await;
        problematic.contains(&video.id)
            || extract_video_id(&video.video_url).is_some_and(|id| problematic.contains(&id))
    }

    async fn check(&self, video: &Video) -> ValidationResult {
        let Some(embed_url) = youtube_embed_url(&video.video_url) else {
            return ValidationResult::unplayable(ERROR_INVALID_URL);
        };

        let youtube_id = embed_video_id(&embed_url);
        let problematic = self.reports.problematic_ids().await;
        let reported = problematic.contains(&video.id)
            || youtube_id.as_ref().is_some_and(|id| problematic.contains(id));
        if reported {
            return ValidationResult::unplayable(ERROR_REPORTED);
        }

        if embed_url.contains(PLAYLIST_EMBED_MARKER) {
            return ValidationResult::playable(embed_url);
        }

        match (&self.status_checker, youtube_id) {
            (Some(checker), Some(id)) => match checker.video_status(&id).await {
                Ok(Some(status)) if status.is_embeddable() => ValidationResult::playable(embed_url),
                Ok(Some(status)) => {
                    debug!(video_id = %id, privacy = %status.privacy_status, upload = %status.upload_status, "Video not embeddable");
                    ValidationResult::unplayable(ERROR_UNAVAILABLE)
                }
                Ok(None) => ValidationResult::unplayable(ERROR_NOT_FOUND),
                Err(e) => {
                    debug!(video_id = %id, error = %e, "Status check failed");
                    ValidationResult::unplayable(ERROR_CHECK_FAILED)
                }
            },
            _ => {
                if self.synthetic_failure_rate > 0.0
                    && rand::thread_rng().gen_bool(self.synthetic_failure_rate)
                {
                    ValidationResult::unplayable(ERROR_UNAVAILABLE)
                } else {
                    ValidationResult::playable(embed_url)
                }
            }
        }
    }

    /// Validate concurrently and keep the playable videos in their original order
    pub async fn filter_valid_videos(&self, videos: Vec<Video>) -> Vec<Video> {
        let started = Instant::now();
        let total = videos.len();
        let results = join_all(videos.iter().map(|video| self.validate(video))).await;

        let valid: Vec<Video> = videos
            .into_iter()
            .zip(results)
            .filter(|(_, result)| result.playable)
            .map(|(video, _)| video)
            .collect();

        log_performance!(
            "filter_valid_videos",
            duration_ms = started.elapsed().as_millis() as u64,
            count = total
        );
        debug!(total = total, valid = valid.len(), "Filtered videos");
        valid
    }

    /// Record a report and force the next validation of that video to re-check
    pub async fn mark_problematic(
        &self,
        video_id: &str,
        issue_type: &str,
        user_id: Option<String>,
    ) -> Result<(), StoreError> {
        self.reports
            .append(IssueReport {
                video_id: video_id.to_string(),
                issue_type: issue_type.to_string(),
                timestamp: Utc::now(),
                user_id,
            })
            .await?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.evict(&video_id.to_string()).await;
        self.cache.evict(&format!("gt_{}", video_id)).await;
        for video in video_catalog::all_videos() {
            if extract_video_id(&video.video_url).as_deref() == Some(video_id) {
                self.cache.evict(&video.id).await;
            }
        }

        info!(video_id = %video_id, issue_type = %issue_type, "Video marked as problematic");
        Ok(())
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_url_for_watch_with_playlist() {
        assert_eq!(
            youtube_embed_url("https://www.youtube.com/watch?v=R088uR4N6lY&list=PLabc_123").as_deref(),
            Some("https://www.youtube.com/embed/R088uR4N6lY?list=PLabc_123")
        );
    }

    #[test]
    fn test_embed_url_for_videoseries() {
        assert_eq!(
            youtube_embed_url("https://www.youtube.com/watch?v=videoseries&list=PL123").as_deref(),
            Some("https://www.youtube.com/embed/videoseries?list=PL123")
        );
    }

    #[test]
    fn test_embed_url_for_playlist_page_and_short_link() {
        assert_eq!(
            youtube_embed_url("https://www.youtube.com/playlist?list=PLxyz").as_deref(),
            Some("https://www.youtube.com/embed/videoseries?list=PLxyz")
        );
        assert_eq!(
            youtube_embed_url("https://youtu.be/FqX3qLwN84Y").as_deref(),
            Some("https://www.youtube.com/embed/FqX3qLwN84Y")
        );
    }

    #[test]
    fn test_embed_url_without_id_or_playlist() {
        assert_eq!(youtube_embed_url("https://example.com/aula"), None);
        assert_eq!(youtube_embed_url(""), None);
    }

    #[test]
    fn test_extract_video_id_skips_videoseries() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=FqX3qLwN84Y").as_deref(),
            Some("FqX3qLwN84Y")
        );
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=videoseries&list=PL1"), None);
    }
}
