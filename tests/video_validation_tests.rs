use async_trait::async_trait;
use netescola::{
    local_store::{LocalStore, ReportLog},
    video_catalog,
    video_validator::{VideoValidator, ERROR_CHECK_FAILED, ERROR_INVALID_URL, ERROR_NOT_FOUND, ERROR_REPORTED, ERROR_UNAVAILABLE},
    youtube::{VideoStatus, VideoStatusChecker},
    ChannelSearchError, SchoolGrade, Video, VideoSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Answers every status lookup the same way and counts the lookups
struct CountingChecker {
    calls: AtomicUsize,
    reply: fn(&str) -> Result<Option<VideoStatus>, ChannelSearchError>,
}

impl CountingChecker {
    fn new(reply: fn(&str) -> Result<Option<VideoStatus>, ChannelSearchError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoStatusChecker for CountingChecker {
    async fn video_status(&self, video_id: &str) -> Result<Option<VideoStatus>, ChannelSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(video_id)
    }
}

fn public(_: &str) -> Result<Option<VideoStatus>, ChannelSearchError> {
    Ok(Some(VideoStatus {
        privacy_status: "public".to_string(),
        upload_status: "processed".to_string(),
    }))
}

fn video(id: &str, url: &str) -> Video {
    Video {
        id: id.to_string(),
        title: "Aula".to_string(),
        description: String::new(),
        thumbnail_url: String::new(),
        video_url: url.to_string(),
        subject: "Química".to_string(),
        grade_levels: vec![SchoolGrade::Serie3Em],
        source: VideoSource::GoiasTec,
        justification: None,
    }
}

fn validator(checker: Option<Arc<CountingChecker>>) -> VideoValidator {
    let checker = checker.map(|c| c as Arc<dyn VideoStatusChecker>);
    VideoValidator::new(ReportLog::new(LocalStore::in_memory()), checker)
}

#[tokio::test]
async fn test_videoseries_playlist_embeds_without_lookup() {
    let checker = CountingChecker::new(public);
    let validator = validator(Some(checker.clone()));

    let result = validator
        .validate(&video("playlist", "https://www.youtube.com/watch?v=videoseries&list=PL123"))
        .await;

    assert!(result.playable);
    assert_eq!(
        result.embed_url.as_deref(),
        Some("https://www.youtube.com/embed/videoseries?list=PL123")
    );
    assert_eq!(checker.calls(), 0);
}

#[tokio::test]
async fn test_url_without_id_or_playlist_is_invalid_without_network() {
    let checker = CountingChecker::new(public);
    let validator = validator(Some(checker.clone()));

    let result = validator.validate(&video("broken", "https://example.com/aula-de-quimica")).await;

    assert!(!result.playable);
    assert_eq!(result.embed_url, None);
    assert_eq!(result.error.as_deref(), Some(ERROR_INVALID_URL));
    assert_eq!(checker.calls(), 0);
}

#[tokio::test]
async fn test_validation_is_cached_within_ttl() {
    let checker = CountingChecker::new(public);
    let validator = validator(Some(checker.clone()));
    let lesson = video("gt3_qui_termoquimica", "https://www.youtube.com/watch?v=FqX3qLwN84Y");

    let first = validator.validate(&lesson).await;
    let second = validator.validate(&lesson).await;

    assert_eq!(first, second);
    assert!(first.playable);
    assert_eq!(checker.calls(), 1);
    assert_eq!(validator.cache_stats().await.valid, 1);
}

#[tokio::test]
async fn test_reported_video_is_unplayable_on_next_validation() {
    let checker = CountingChecker::new(public);
    let validator = validator(Some(checker.clone()));
    let lesson = video("gt3_qui_termoquimica", "https://www.youtube.com/watch?v=FqX3qLwN84Y");

    assert!(validator.validate(&lesson).await.playable);

    validator
        .mark_problematic("gt3_qui_termoquimica", "not_loading", Some("20231001".to_string()))
        .await
        .unwrap();

    let result = validator.validate(&lesson).await;
    assert!(!result.playable);
    assert_eq!(result.error.as_deref(), Some(ERROR_REPORTED));
    assert_eq!(validator.reports().all().await.unwrap().len(), 1);
}

/// Public status, answered only after a delay
struct SlowChecker;

#[async_trait]
impl VideoStatusChecker for SlowChecker {
    async fn video_status(&self, video_id: &str) -> Result<Option<VideoStatus>, ChannelSearchError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        public(video_id)
    }
}

#[tokio::test]
async fn test_report_during_validation_is_not_overwritten() {
    let validator = VideoValidator::new(
        ReportLog::new(LocalStore::in_memory()),
        Some(Arc::new(SlowChecker) as Arc<dyn VideoStatusChecker>),
    );
    let lesson = video("v1", "https://www.youtube.com/watch?v=FqX3qLwN84Y");

    let in_flight = {
        let validator = validator.clone();
        let lesson = lesson.clone();
        tokio::spawn(async move { validator.validate(&lesson).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    validator.mark_problematic("v1", "not_loading", None).await.unwrap();

    let first = in_flight.await.unwrap();
    assert!(!first.playable);
    assert_eq!(first.error.as_deref(), Some(ERROR_REPORTED));

    let next = validator.validate(&lesson).await;
    assert!(!next.playable);
    assert_eq!(next.error.as_deref(), Some(ERROR_REPORTED));
}

#[tokio::test]
async fn test_report_by_youtube_id_blocks_catalog_entry() {
    let validator = validator(None);
    let catalog_video = video_catalog::find_by_id("gt3_qui_termoquimica").unwrap();

    assert!(validator.validate(catalog_video).await.playable);
    validator.mark_problematic("FqX3qLwN84Y", "private", None).await.unwrap();

    let result = validator.validate(catalog_video).await;
    assert_eq!(result.error.as_deref(), Some(ERROR_REPORTED));
}

#[tokio::test]
async fn test_status_lookup_outcomes() {
    let private = validator(Some(CountingChecker::new(|_| {
        Ok(Some(VideoStatus {
            privacy_status: "private".to_string(),
            upload_status: "processed".to_string(),
        }))
    })));
    let missing = validator(Some(CountingChecker::new(|_| Ok(None))));
    let failing = validator(Some(CountingChecker::new(|_| {
        Err(ChannelSearchError::Status {
            status: 403,
            message: "quotaExceeded".to_string(),
        })
    })));
    let lesson = video("gt3_qui_velocidade", "https://www.youtube.com/watch?v=9_b3oY7s6c4");

    assert_eq!(private.validate(&lesson).await.error.as_deref(), Some(ERROR_UNAVAILABLE));
    assert_eq!(missing.validate(&lesson).await.error.as_deref(), Some(ERROR_NOT_FOUND));
    assert_eq!(failing.validate(&lesson).await.error.as_deref(), Some(ERROR_CHECK_FAILED));
}

#[tokio::test]
async fn test_filter_valid_videos_keeps_order() {
    let validator = validator(None);
    let videos = vec![
        video("a", "https://www.youtube.com/watch?v=FqX3qLwN84Y"),
        video("b", "not a url"),
        video("c", "https://youtu.be/9_b3oY7s6c4"),
    ];

    let valid = validator.filter_valid_videos(videos).await;
    let ids: Vec<&str> = valid.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_synthetic_failure_rate_one_rejects_unverified_videos() {
    let validator = validator(None).with_synthetic_failure_rate(1.0);
    let lesson = video("gt3_qui_equilibrio", "https://www.youtube.com/watch?v=G8m1tq3h8y8");
    let playlist = video("playlist", "https://www.youtube.com/watch?v=videoseries&list=PL123");

    assert_eq!(validator.validate(&lesson).await.error.as_deref(), Some(ERROR_UNAVAILABLE));
    assert!(validator.validate(&playlist).await.playable);
}

#[tokio::test]
async fn test_catalog_grades_are_all_supported() {
    for video in video_catalog::all_videos() {
        assert!(!video.grade_levels.is_empty(), "{} has no grade", video.id);
    }
    assert!(video_catalog::find_by_id("gt8_cie_1").is_none());
    assert_eq!(
        video_catalog::find_by_id("gt9_cie_1").unwrap().grade_levels,
        vec![SchoolGrade::Ano9Ef]
    );
}
