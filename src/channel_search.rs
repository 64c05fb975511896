use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::errors::ChannelSearchError;
use crate::models::{Bimester, GradeBand, SchoolGrade, Video, VideoSource};
use crate::ttl_cache::{CacheStats, TtlCache};
use crate::youtube::{SearchItem, SearchOrder, SearchQuery, VideoPlatformApi};

use crate::{log_service_start, log_service_success, log_service_warn};

pub const DESCRIPTION_LIMIT: usize = 300;
pub const UNKNOWN_SUBJECT: &str = "Geral";

const SUBJECT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Matemática", &["matemática", "matematica", "álgebra", "algebra", "geometria", "trigonometria", "função", "funcao", "equação", "equacao"]),
    ("Português", &["português", "portugues", "literatura", "gramática", "gramatica", "redação", "redacao", "interpretação", "interpretacao"]),
    ("Física", &["física", "fisica", "mecânica", "mecanica", "eletricidade", "óptica", "optica", "termodinâmica", "termodinamica"]),
    ("Química", &["química", "quimica", "orgânica", "organica", "inorgânica", "inorganica", "estequiometria", "atomística", "atomistica"]),
    ("Biologia", &["biologia", "botânica", "botanica", "zoologia", "genética", "genetica", "ecologia", "citologia"]),
    ("História", &["história", "historia", "brasil", "mundo", "guerra", "república", "republica", "idade média", "idade media"]),
    ("Geografia", &["geografia", "relevo", "clima", "população", "populacao", "urbana", "rural", "cartografia"]),
    ("Filosofia", &["filosofia", "ética", "etica", "lógica", "logica", "epistemologia", "metafísica", "metafisica"]),
    ("Sociologia", &["sociologia", "sociedade", "cultura", "política", "politica", "social", "antropologia"]),
    ("Inglês", &["inglês", "ingles", "english", "grammar", "vocabulary", "conversation"]),
];

const GRADE_MARKERS: &[(SchoolGrade, &[&str])] = &[
    (SchoolGrade::Ano9Ef, &["9º ano", "9 ano", "nono ano"]),
    (SchoolGrade::Serie1Em, &["1ª série", "1 série", "primeiro ano", "1º ano"]),
    (SchoolGrade::Serie2Em, &["2ª série", "2 série", "segundo ano", "2º ano"]),
    (SchoolGrade::Serie3Em, &["3ª série", "3 série", "terceiro ano", "3º ano"]),
];

/// Channel ids per grade band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDirectory {
    pub medio: String,
    pub fundamental: String,
}

impl ChannelDirectory {
    pub fn channel_for(&self, grade: SchoolGrade) -> &str {
        match grade.band() {
            GradeBand::Fundamental => &self.fundamental,
            GradeBand::Medio => &self.medio,
        }
    }
}

pub fn subject_keywords(subject: &str) -> Vec<String> {
    SUBJECT_KEYWORDS
        .iter()
        .find(|(name, _)| *name == subject)
        .map(|(_, keywords)| keywords.iter().map(|k| k.to_string()).collect())
        .unwrap_or_else(|| vec![subject.to_lowercase()])
}

/// Grades named in the text; all médio grades when none is named
pub fn classify_grade_levels(title: &str, description: &str) -> Vec<SchoolGrade> {
    let text = format!("{} {}", title, description).to_lowercase();
    let grades: Vec<SchoolGrade> = GRADE_MARKERS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .map(|(grade, _)| *grade)
        .collect();

    if grades.is_empty() {
        SchoolGrade::MEDIO.to_vec()
    } else {
        grades
    }
}

pub fn identify_subject(title: &str, description: &str) -> String {
    let text = format!("{} {}", title, description).to_lowercase();
    SUBJECT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(subject, _)| subject.to_string())
        .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        let head: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", head)
    } else {
        description.to_string()
    }
}

fn to_video(item: SearchItem, subject: String) -> Video {
    let grade_levels = classify_grade_levels(&item.title, &item.description);
    Video {
        id: format!("gt_{}", item.video_id),
        description: truncate_description(&item.description),
        thumbnail_url: item.thumbnail_url,
        video_url: format!("https://www.youtube.com/watch?v={}", item.video_id),
        title: item.title,
        subject,
        grade_levels,
        source: VideoSource::GoiasTec,
        justification: None,
    }
}

/// Searches the regional channel for lessons by subject
#[derive(Clone)]
pub struct ChannelSearchClient {
    api: Option<Arc<dyn VideoPlatformApi>>,
    channels: ChannelDirectory,
    cache: TtlCache<String, Vec<Video>>,
}

impl ChannelSearchClient {
    pub fn new(api: Option<Arc<dyn VideoPlatformApi>>, channels: ChannelDirectory, cache_ttl_minutes: i64) -> Self {
        Self {
            api,
            channels,
            cache: TtlCache::with_minutes("channel_search", cache_ttl_minutes),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    fn cache_key(subject: &str, grade: SchoolGrade, max_results: usize, bimester: Option<Bimester>) -> String {
        let mut key = format!("{}_{}", subject, max_results);
        if let Some(bimester) = bimester {
            key.push_str(&format!("_{}", bimester.number()));
        }
        if grade.band() == GradeBand::Fundamental {
            key.push_str("_ef");
        }
        key
    }

    /// Search one keyword at a time, deduplicating by video id across keywords.
    ///
    /// Without an API key this returns no videos rather than an error.
    pub async fn search_videos_by_subject(
        &self,
        subject: &str,
        grade: SchoolGrade,
        max_results: usize,
        bimester: Option<Bimester>,
    ) -> Result<Vec<Video>, ChannelSearchError> {
        let Some(api) = &self.api else {
            log_service_warn!(
                "channel_search",
                "search_videos_by_subject",
                format!("YouTube API key not configured, no videos for {}", subject)
            );
            return Ok(Vec::new());
        };

        let cache_key = Self::cache_key(subject, grade, max_results, bimester);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        log_service_start!("channel_search", "search_videos_by_subject", subject = subject);
        let started = Instant::now();

        let channel_id = self.channels.channel_for(grade).to_string();
        let mut seen = HashSet::new();
        let mut videos = Vec::new();

        for keyword in subject_keywords(subject) {
            let query = match bimester {
                Some(b) => format!("{} {}º bimestre", keyword, b.number()),
                None => keyword,
            };

            let items = api
                .search(&SearchQuery {
                    channel_id: channel_id.clone(),
                    query: Some(query),
                    max_results,
                    order: SearchOrder::Relevance,
                })
                .await?;

            for item in items {
                if seen.insert(item.video_id.clone()) {
                    videos.push(to_video(item, subject.to_string()));
                }
            }
        }

        videos.truncate(max_results);

        log_service_success!(
            "channel_search",
            "search_videos_by_subject",
            count = videos.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        self.cache.set(cache_key, videos.clone()).await;
        Ok(videos)
    }

    /// Latest uploads of the grade's channel, subject guessed from the text
    pub async fn recent_videos(&self, grade: SchoolGrade, max_results: usize) -> Result<Vec<Video>, ChannelSearchError> {
        let Some(api) = &self.api else {
            log_service_warn!("channel_search", "recent_videos", "YouTube API key not configured, no recent videos available");
            return Ok(Vec::new());
        };

        let cache_key = format!("recent_{}_{}", self.channels.channel_for(grade), max_results);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let items = api
            .search(&SearchQuery {
                channel_id: self.channels.channel_for(grade).to_string(),
                query: None,
                max_results,
                order: SearchOrder::Date,
            })
            .await?;

        let mut seen = HashSet::new();
        let videos: Vec<Video> = items
            .into_iter()
            .filter(|item| seen.insert(item.video_id.clone()))
            .map(|item| {
                let subject = identify_subject(&item.title, &item.description);
                to_video(item, subject)
            })
            .collect();

        debug!(count = videos.len(), "Fetched recent channel videos");
        self.cache.set(cache_key, videos.clone()).await;
        Ok(videos)
    }

    pub fn available_subjects(&self) -> Vec<&'static str> {
        SUBJECT_KEYWORDS.iter().map(|(subject, _)| *subject).collect()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
