pub mod api;
pub mod channel_search;
pub mod config;
pub mod content_generator;
pub mod dashboard;
pub mod errors;
pub mod llm_providers;
pub mod llm_service;
pub mod local_store;
pub mod logging;
pub mod models;
pub mod rate_limiter;
pub mod recommendation;
pub mod retry;
pub mod roster;
pub mod thumbnail;
pub mod ttl_cache;
pub mod video_catalog;
pub mod video_validator;
pub mod youtube;

pub use api::{create_router, AppState};
pub use channel_search::{ChannelDirectory, ChannelSearchClient};
pub use config::Config;
pub use content_generator::{ContentGenerator, Generated};
pub use errors::*;
pub use llm_providers::{ApiVersion, GeminiProvider, GenerativeBackend, JsonResponseParser};
pub use llm_service::{AiContext, LLMService};
pub use local_store::{LocalStore, NotificationFlags, ReportLog};
pub use models::*;
pub use rate_limiter::{RateGate, RateLimitConfig};
pub use recommendation::{RecommendationAssembler, RecommendationSet};
pub use retry::RetryPolicy;
pub use roster::Roster;
pub use thumbnail::ThumbnailChecker;
pub use ttl_cache::TtlCache;
pub use video_validator::VideoValidator;
pub use youtube::YouTubeApi;
