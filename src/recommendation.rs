use futures_util::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, warn};

use crate::channel_search::ChannelSearchClient;
use crate::content_generator::ContentGenerator;
use crate::errors::ChannelSearchError;
use crate::models::{AnalysisData, DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD, Video};
use crate::video_catalog;
use crate::video_validator::VideoValidator;

use crate::{log_performance, log_service_error};

pub const PLACEHOLDER_JUSTIFICATION: &str =
    "Vídeo selecionado para reforçar os conteúdos do seu bimestre.";

/// Only the first videos get an AI justification, bounding AI calls per request
pub const JUSTIFIED_COUNT: usize = 3;
pub const FALLBACK_COUNT: usize = 9;
pub const CHANNEL_RESULTS_PER_SUBJECT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// Student picked the subjects; channel content, or the catalog for those subjects when the channel has none
    Manual,
    /// Subjects below the threshold; channel content plus the static catalog
    Automatic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub mode: RecommendationMode,
    pub focus_subjects: Vec<String>,
    pub videos: Vec<Video>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Weak-subject videos first, then curated sources, then by title
pub fn sort_by_priority(videos: &mut [Video], weak_subjects: &[String]) {
    let is_weak = |video: &Video| weak_subjects.iter().any(|s| video.matches_subject(s));

    videos.sort_by(|a, b| {
        is_weak(b)
            .cmp(&is_weak(a))
            .then_with(|| b.source.is_curated().cmp(&a.source.is_curated()))
            .then_with(|| compare_titles(&a.title, &b.title))
    });
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Keep the first video seen for each source URL
pub fn dedupe_by_url(videos: Vec<Video>) -> Vec<Video> {
    let mut seen = HashSet::new();
    videos
        .into_iter()
        .filter(|video| seen.insert(video.video_url.clone()))
        .collect()
}

#[derive(Clone)]
pub struct RecommendationAssembler {
    channel: ChannelSearchClient,
    validator: VideoValidator,
    generator: ContentGenerator,
}

impl RecommendationAssembler {
    pub fn new(channel: ChannelSearchClient, validator: VideoValidator, generator: ContentGenerator) -> Self {
        Self {
            channel,
            validator,
            generator,
        }
    }

    /// Always returns content when the catalog has videos for the grade
    pub async fn assemble(&self, analysis: &AnalysisData, subject_filters: &[String]) -> RecommendationSet {
        let started = Instant::now();

        let set = match self.try_assemble(analysis, subject_filters).await {
            Ok(set) if set.videos.is_empty() && set.mode == RecommendationMode::Automatic => {
                warn!("No playable recommendations, using the static catalog");
                Self::catalog_fallback(analysis, set.focus_subjects, "no playable videos found")
            }
            Ok(set) if set.videos.is_empty() => {
                warn!(focus = ?set.focus_subjects, "No channel videos for the selected subjects, using the static catalog");
                Self::subject_catalog_fallback(analysis, set.focus_subjects, "no channel videos for the selected subjects")
            }
            Ok(set) => set,
            Err(err) => {
                log_service_error!("recommendation", "assemble", error = err);
                if subject_filters.is_empty() {
                    let focus = analysis.weak_subjects(DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD);
                    Self::catalog_fallback(analysis, focus, &err.to_string())
                } else {
                    Self::subject_catalog_fallback(analysis, subject_filters.to_vec(), &err.to_string())
                }
            }
        };

        log_performance!(
            "assemble_recommendations",
            duration_ms = started.elapsed().as_millis() as u64,
            count = set.videos.len()
        );
        set
    }

    pub async fn try_assemble(
        &self,
        analysis: &AnalysisData,
        subject_filters: &[String],
    ) -> Result<RecommendationSet, ChannelSearchError> {
        let weak_subjects = analysis.weak_subjects(DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD);
        let (mode, focus_subjects) = if subject_filters.is_empty() {
            (RecommendationMode::Automatic, weak_subjects.clone())
        } else {
            (RecommendationMode::Manual, subject_filters.to_vec())
        };

        let searches = focus_subjects.iter().map(|subject| {
            self.channel.search_videos_by_subject(
                subject,
                analysis.school_grade,
                CHANNEL_RESULTS_PER_SUBJECT,
                Some(analysis.bimester),
            )
        });

        let mut pool = Vec::new();
        for result in join_all(searches).await {
            pool.extend(result?);
        }

        if mode == RecommendationMode::Automatic {
            pool.extend(video_catalog::videos_for_grade(analysis.school_grade));
        }

        let mut candidates = dedupe_by_url(pool);
        sort_by_priority(&mut candidates, &weak_subjects);

        let playable = self.validator.filter_valid_videos(candidates).await;
        let videos = self.justify(playable, analysis).await;

        info!(
            mode = ?mode,
            focus = ?focus_subjects,
            count = videos.len(),
            "Recommendations assembled"
        );

        Ok(RecommendationSet {
            mode,
            focus_subjects,
            videos,
            fallback_reason: None,
        })
    }

    async fn justify(&self, videos: Vec<Video>, analysis: &AnalysisData) -> Vec<Video> {
        let top = videos.len().min(JUSTIFIED_COUNT);
        let justifications = join_all(
            videos[..top]
                .iter()
                .map(|video| self.generator.generate_video_justification(video, analysis)),
        )
        .await;

        let mut justified: Vec<Video> = videos[..top]
            .iter()
            .zip(justifications)
            .map(|(video, text)| video.with_justification(text.into_inner()))
            .collect();

        justified.extend(videos[top..].iter().map(|video| match &video.justification {
            Some(_) => video.clone(),
            None => video.with_justification(PLACEHOLDER_JUSTIFICATION),
        }));

        justified
    }

    fn catalog_fallback(analysis: &AnalysisData, focus_subjects: Vec<String>, reason: &str) -> RecommendationSet {
        let videos = video_catalog::videos_for_grade(analysis.school_grade)
            .into_iter()
            .take(FALLBACK_COUNT)
            .map(|video| video.with_justification(PLACEHOLDER_JUSTIFICATION))
            .collect();

        RecommendationSet {
            mode: RecommendationMode::Automatic,
            focus_subjects,
            videos,
            fallback_reason: Some(reason.to_string()),
        }
    }

    /// Catalog videos for the student's grade matching the chosen subjects.
    /// May be empty; the reason is always set.
    fn subject_catalog_fallback(
        analysis: &AnalysisData,
        focus_subjects: Vec<String>,
        reason: &str,
    ) -> RecommendationSet {
        let pool = focus_subjects
            .iter()
            .flat_map(|subject| video_catalog::videos_for_subject(subject, Some(analysis.school_grade)))
            .collect();

        let videos = dedupe_by_url(pool)
            .into_iter()
            .take(FALLBACK_COUNT)
            .map(|video| video.with_justification(PLACEHOLDER_JUSTIFICATION))
            .collect();

        RecommendationSet {
            mode: RecommendationMode::Manual,
            focus_subjects,
            videos,
            fallback_reason: Some(reason.to_string()),
        }
    }
}
