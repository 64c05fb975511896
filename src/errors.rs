use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Failure of a single generative-AI call, classified so the retry layer can
/// branch on the variant instead of inspecting messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,

    #[error("AI rate limit or quota exceeded: {0}")]
    RateLimited(String),

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("AI request failed: {0}")]
    Unknown(String),
}

impl AiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AiError::RateLimited(_))
    }

    /// Classify a non-success HTTP reply from the AI provider
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 || body.contains("RESOURCE_EXHAUSTED") || body.to_lowercase().contains("quota") {
            AiError::RateLimited(format!("HTTP {}: {}", status, body))
        } else {
            AiError::Unknown(format!("HTTP {}: {}", status, body))
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().is_some_and(|s| s.as_u16() == 429) {
            AiError::RateLimited(err.to_string())
        } else if err.is_decode() {
            AiError::InvalidResponse(err.to_string())
        } else {
            AiError::Unknown(err.to_string())
        }
    }
}

/// Errors from the video platform search and metadata endpoints
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelSearchError {
    #[error("Video platform request failed: {0}")]
    Http(String),

    #[error("Video platform returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode video platform response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ChannelSearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChannelSearchError::Decode(err.to_string())
        } else {
            ChannelSearchError::Http(err.to_string())
        }
    }
}

/// Errors from the local key-value store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Local store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local store entry is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoginError {
    #[error("Registration and password are required")]
    MissingCredentials,

    #[error("Invalid registration or password")]
    InvalidCredentials,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Cannot {action} while in step {from}")]
pub struct TransitionError {
    pub action: &'static str,
    pub from: &'static str,
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] LoginError),

    #[error("Invalid state: {0}")]
    InvalidState(#[from] TransitionError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::Unauthorized(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Login rejected"
                );
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| "Matrícula ou senha inválida.".to_string()),
                    )),
                )
            }
            ApiError::InvalidState(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Invalid state transition"
                );
                (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::StorageError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Storage error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "Could not save your changes. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }

    /// Simple conversion without context
    pub fn to_response(self) -> (StatusCode, Json<ApiResponse<()>>) {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}

/// Helper macro for structured error logging
#[macro_export]
macro_rules! api_error {
    (not_found, $operation:expr, $resource_type:expr, $id:expr) => {
        $crate::errors::ApiError::NotFound(format!("{} with id '{}' not found", $resource_type, $id))
            .to_response_with_context(
                $crate::errors::ErrorContext::new($operation, $resource_type).with_id($id),
            )
    };

    (validation, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::ValidationError($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (state, $operation:expr, $resource_type:expr, $id:expr, $error:expr) => {
        $crate::errors::ApiError::InvalidState($error).to_response_with_context(
            $crate::errors::ErrorContext::new($operation, $resource_type).with_id($id),
        )
    };

    (storage, $operation:expr, $resource_type:expr, $error:expr) => {
        $crate::errors::ApiError::StorageError($error)
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };
}
