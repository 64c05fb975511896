use anyhow::Result;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use netescola::{
    api::{create_router, AppState},
    channel_search::{ChannelDirectory, ChannelSearchClient},
    config::{Config, LoggingConfig},
    content_generator::ContentGenerator,
    llm_service::AiContext,
    local_store::{LocalStore, NotificationFlags, ReportLog},
    log_system_event,
    roster::Roster,
    video_validator::VideoValidator,
    youtube::{VideoPlatformApi, VideoStatusChecker, YouTubeApi},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logging first so configuration loading is recorded
    let _guard = setup_logging(&LoggingConfig::from_env())?;

    let config = Config::from_env()?;
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting NetEscola+ reinforcement server");

    let store = LocalStore::open(&config.storage.local_store_path).await?;
    info!(path = %config.storage.local_store_path.display(), "Local store opened");

    let youtube = config
        .youtube
        .api_key
        .clone()
        .map(|key| Arc::new(YouTubeApi::new(key, config.youtube.base_url.clone())));

    let platform: Option<Arc<dyn VideoPlatformApi>> = youtube
        .clone()
        .map(|api| api as Arc<dyn VideoPlatformApi>);
    let status_checker: Option<Arc<dyn VideoStatusChecker>> = if config.validation.live_check {
        youtube.map(|api| api as Arc<dyn VideoStatusChecker>)
    } else {
        None
    };

    let channel = ChannelSearchClient::new(
        platform,
        ChannelDirectory {
            medio: config.youtube.channel_id_medio.clone(),
            fundamental: config.youtube.channel_id_fundamental.clone(),
        },
        config.youtube.cache_ttl_minutes,
    );

    let validator = VideoValidator::new(ReportLog::new(store.clone()), status_checker)
        .with_synthetic_failure_rate(config.validation.synthetic_failure_rate);

    let generator = ContentGenerator::new(AiContext::from_config(&config.ai));
    info!(
        ai_configured = generator.is_ai_configured(),
        youtube_configured = channel.is_configured(),
        "Services initialized"
    );

    let state = AppState::new(
        Arc::new(Roster::builtin().clone()),
        generator,
        channel,
        validator,
        NotificationFlags::new(store),
    );

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    log_system_event!(shutdown, component = "server", "Server stopped");
    Ok(())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .boxed()
    });

    let mut guard = None;
    let file_layer = if config.file_enabled {
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create log directory {}: {}", config.log_directory, e);
        });

        // Daily rotation, no ANSI colors in files
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "netescola.log");
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking_file)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        directory = %config.log_directory,
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
