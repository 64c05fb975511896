// Macros file - tracing macros are referenced by full path inside each definition

/// Standardized logging macros so every component reports the same field names
/// (`operation`, `session_id`, `video_id`, `endpoint`, `model`, ...).

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, session_id = $session_id:expr) => {
        tracing::debug!(
            operation = $operation,
            session_id = %$session_id,
            "API operation started"
        );
    };
    ($operation:expr, video_id = $video_id:expr) => {
        tracing::debug!(
            operation = $operation,
            video_id = %$video_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            session_id = %$session_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, video_id = $video_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            video_id = %$video_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, session_id = $session_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            session_id = %$session_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            session_id = %$session_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Service Layer Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, subject = $subject:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            subject = %$subject,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            count = $count,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation started"
        );
    };
}

#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            count = $count,
            duration_ms = $duration,
            "Service operation completed successfully"
        );
    };
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation completed: {}", $msg
        );
    };
}

#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, error = $error:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            error = %$error,
            "Service operation failed"
        );
    };
}

#[macro_export]
macro_rules! log_service_warn {
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::warn!(
            service = $service,
            operation = $operation,
            "Service warning: {}",
            $msg
        );
    };
}

// ============================================================================
// AI Call Logging Macros
// ============================================================================

/// Log generative-AI calls with endpoint and model context
#[macro_export]
macro_rules! log_ai_operation {
    (success, $operation:expr, endpoint = $endpoint:expr, model = $model:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = "ai",
            operation = $operation,
            endpoint = %$endpoint,
            model = %$model,
            duration_ms = $duration,
            "AI call succeeded"
        );
    };
    (failure, $operation:expr, endpoint = $endpoint:expr, model = $model:expr, error = $error:expr) => {
        tracing::warn!(
            component = "ai",
            operation = $operation,
            endpoint = %$endpoint,
            model = %$model,
            error = %$error,
            "AI call failed, trying next combination"
        );
    };
    (fallback, $operation:expr, reason = $reason:expr) => {
        tracing::warn!(
            component = "ai",
            operation = $operation,
            reason = %$reason,
            "Using template fallback"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_ms = $duration:expr, count = $count:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            count = $count,
            "Performance metrics"
        );
    };
    ($operation:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            "Performance metrics"
        );
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, video_id = $video_id:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            video_id = %$video_id,
            error = %$error,
            "Validation failed"
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

// ============================================================================
// Cache Logging Macros
// ============================================================================

/// Log cache hits, misses and evictions with the cache name
#[macro_export]
macro_rules! log_cache {
    (hit, $cache:expr, key = $key:expr) => {
        tracing::debug!(cache = $cache, key = ?$key, "Cache hit");
    };
    (miss, $cache:expr, key = $key:expr) => {
        tracing::debug!(cache = $cache, key = ?$key, "Cache miss");
    };
    (expired, $cache:expr, key = $key:expr) => {
        tracing::debug!(cache = $cache, key = ?$key, "Cache entry expired, removed");
    };
    (evict, $cache:expr, key = $key:expr) => {
        tracing::debug!(cache = $cache, key = ?$key, "Evicted cache entry");
    };
    (store, $cache:expr, size = $size:expr) => {
        tracing::debug!(cache = $cache, size = $size, "Cached value");
    };
    (clear, $cache:expr) => {
        tracing::debug!(cache = $cache, "Cache cleared");
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let session_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        log_api_start!("get_summary", session_id = session_id);
        log_api_start!("report_video", video_id = "gt9_mat_1");
        log_api_start!("health");

        log_api_success!("get_summary", session_id = session_id, "summary ready");
        log_api_success!("report_video", video_id = "gt9_mat_1", "report saved");
        log_api_success!("validate_videos", count = 5, "videos checked");
        log_api_success!("health", "ok");

        log_api_error!("login", error = error, "unexpected failure");
        log_api_warn!("recommendations", session_id = session_id, "stale result dropped");

        log_service_start!("channel_search", "search_videos", subject = "Matemática");
        log_service_start!("video_validator", "filter_valid_videos", count = 3);
        log_service_success!("video_validator", "filter_valid_videos", count = 3, duration_ms = 12);
        log_service_warn!("channel_search", "search_videos", "keyword query failed");

        log_ai_operation!(success, "quiz", endpoint = "AIza***1234@v1beta", model = "gemini-2.5-flash", duration_ms = 900);
        log_ai_operation!(failure, "quiz", endpoint = "AIza***1234@v1", model = "gemini-1.5-flash", error = "HTTP 404");
        log_ai_operation!(fallback, "summary", reason = "AI service is not configured");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");

        log_performance!("recommendations", duration_ms = 2500, count = 9);
        log_performance!("validate", duration_ms = 50);

        log_validation!(success, "configuration", "request validated");
        log_validation!(failure, "video_validator", video_id = "gt9_mat_1", error = "reported");

        log_cache!(hit, "video_validation", key = "gt9_mat_1");
        log_cache!(miss, "channel_search", key = "Matemática_10");
        log_cache!(store, "thumbnails", size = 4);
        log_cache!(clear, "thumbnails");
    }
}
