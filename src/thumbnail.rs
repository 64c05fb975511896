use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::Video;
use crate::ttl_cache::TtlCache;
use crate::video_validator::extract_video_id;

/// Grey "Imagem Indisponível" placeholder, 320×180
pub const FALLBACK_THUMBNAIL: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iMzIwIiBoZWlnaHQ9IjE4MCIgdmlld0JveD0iMCAwIDMyMCAxODAiIGZpbGw9Im5vbmUiIHhtbG5zPSJodHRwOi8vd3d3LnczLm9yZy8yMDAwL3N2ZyI+CjxyZWN0IHdpZHRoPSIzMjAiIGhlaWdodD0iMTgwIiBmaWxsPSIjRjNGNEY2Ii8+CjxwYXRoIGQ9Ik0xMzUuNSA2NUwxNTUuNSA4NUwxMzUuNSAxMDVWNjVaIiBmaWxsPSIjOTVBM0I3Ii8+Cjx0ZXh0IHg9IjE2MCIgeT0iMTAwIiBmb250LWZhbWlseT0iQXJpYWwiIGZvbnQtc2l6ZT0iMTQiIGZpbGw9IiM5NUEzQjciPkltYWdlbSBJbmRpc3BvbsOtdmVsPC90ZXh0Pgo8L3N2Zz4=";

const ALTERNATIVE_VARIANTS: [&str; 5] = ["hqdefault", "maxresdefault", "mqdefault", "sddefault", "default"];

/// Answers whether a URL currently resolves
#[async_trait]
pub trait UrlProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// `HEAD` request; any transport error counts as unreachable
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "Thumbnail probe failed");
                false
            }
        }
    }
}

pub fn alternative_thumbnails(video_url: &str) -> Vec<String> {
    match extract_video_id(video_url) {
        Some(id) => ALTERNATIVE_VARIANTS
            .iter()
            .map(|variant| format!("https://img.youtube.com/vi/{}/{}.jpg", id, variant))
            .collect(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailReplacement {
    pub video_id: String,
    pub original_url: String,
    pub replacement_url: String,
}

#[derive(Clone)]
pub struct ThumbnailChecker {
    probe: Arc<dyn UrlProbe>,
    cache: TtlCache<String, bool>,
}

impl ThumbnailChecker {
    pub fn new(probe: Arc<dyn UrlProbe>, cache_ttl_minutes: i64) -> Self {
        Self {
            probe,
            cache: TtlCache::with_minutes("thumbnails", cache_ttl_minutes),
        }
    }

    pub async fn check(&self, url: &str) -> bool {
        let key = url.to_string();
        if let Some(reachable) = self.cache.get(&key).await {
            return reachable;
        }
        let reachable = self.probe.is_reachable(url).await;
        self.cache.set(key, reachable).await;
        reachable
    }

    /// `None` when the current thumbnail works; otherwise the first reachable
    /// alternative, or the placeholder
    pub async fn resolve(&self, video: &Video) -> Option<ThumbnailReplacement> {
        if self.check(&video.thumbnail_url).await {
            return None;
        }

        let mut replacement_url = FALLBACK_THUMBNAIL.to_string();
        for candidate in alternative_thumbnails(&video.video_url) {
            if candidate != video.thumbnail_url && self.check(&candidate).await {
                replacement_url = candidate;
                break;
            }
        }

        info!(video_id = %video.id, replacement = %replacement_url, "Replacing broken thumbnail");
        Some(ThumbnailReplacement {
            video_id: video.id.clone(),
            original_url: video.thumbnail_url.clone(),
            replacement_url,
        })
    }
}
