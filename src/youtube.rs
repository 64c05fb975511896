use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::ChannelSearchError;

pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    Relevance,
    Date,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Relevance => "relevance",
            SearchOrder::Date => "date",
        }
    }
}

/// One channel search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub channel_id: String,
    pub query: Option<String>,
    pub max_results: usize,
    pub order: SearchOrder,
}

/// A search hit reduced to the fields the catalog needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStatus {
    pub privacy_status: String,
    pub upload_status: String,
}

impl VideoStatus {
    /// Public or unlisted, and fully processed
    pub fn is_embeddable(&self) -> bool {
        self.privacy_status != "private" && self.upload_status == "processed"
    }
}

#[async_trait]
pub trait VideoPlatformApi: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>, ChannelSearchError>;
}

/// Live lookup of a single video's status; `None` when the platform does not know the id
#[async_trait]
pub trait VideoStatusChecker: Send + Sync {
    async fn video_status(&self, video_id: &str) -> Result<Option<VideoStatus>, ChannelSearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<WireSearchItem>,
}

#[derive(Debug, Deserialize)]
struct WireSearchItem {
    id: WireResourceId,
    snippet: WireSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: WireThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct WireThumbnails {
    high: Option<WireThumbnail>,
    medium: Option<WireThumbnail>,
    default: Option<WireThumbnail>,
}

#[derive(Debug, Deserialize)]
struct WireThumbnail {
    url: String,
}

impl WireThumbnails {
    fn best_url(self) -> String {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<WireVideo>,
}

#[derive(Debug, Deserialize)]
struct WireVideo {
    status: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatus {
    #[serde(default)]
    privacy_status: String,
    #[serde(default)]
    upload_status: String,
}

/// YouTube Data API v3 client
#[derive(Debug, Clone)]
pub struct YouTubeApi {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeApi {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_YOUTUBE_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> Result<T, ChannelSearchError> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(resource = resource, status = status, error = %message, "YouTube API request failed");
            return Err(ChannelSearchError::Status { status, message });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChannelSearchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl VideoPlatformApi for YouTubeApi {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchItem>, ChannelSearchError> {
        let mut params = vec![
            ("channelId", query.channel_id.clone()),
            ("type", "video".to_string()),
            ("part", "snippet".to_string()),
            ("maxResults", query.max_results.to_string()),
            ("order", query.order.as_str().to_string()),
        ];
        if let Some(q) = &query.query {
            params.push(("q", q.clone()));
        }

        let response: SearchResponse = self.get_json("search", &params).await?;

        let items: Vec<SearchItem> = response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(SearchItem {
                    video_id,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    thumbnail_url: item.snippet.thumbnails.best_url(),
                })
            })
            .collect();

        debug!(query = ?query.query, result_count = items.len(), "YouTube search completed");
        Ok(items)
    }
}

#[async_trait]
impl VideoStatusChecker for YouTubeApi {
    async fn video_status(&self, video_id: &str) -> Result<Option<VideoStatus>, ChannelSearchError> {
        let params = [("part", "status".to_string()), ("id", video_id.to_string())];
        let response: VideosResponse = self.get_json("videos", &params).await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|video| video.status)
            .map(|status| VideoStatus {
                privacy_status: status.privacy_status,
                upload_status: status.upload_status,
            }))
    }
}
