use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::errors::AiError;
use crate::llm_providers::{ApiVersion, GeminiProvider, GenerativeBackend};
use crate::rate_limiter::RateGate;
use crate::retry::{RetryPolicy, retry_with_backoff};

use crate::log_ai_operation;

/// One credential/version pair the service can call
#[derive(Clone)]
struct Endpoint {
    label: String,
    backend: Arc<dyn GenerativeBackend>,
}

/// Multi-key, multi-model Gemini client.
///
/// `generate` walks every endpoint × model combination in order and returns
/// the first success. It never retries on its own; pacing and rate-limit
/// retries belong to [`AiContext`].
#[derive(Clone)]
pub struct LLMService {
    endpoints: Arc<Vec<Endpoint>>,
    models: Arc<Vec<String>>,
}

impl LLMService {
    /// Build one provider per key and API version, primary key first
    pub fn from_config(config: &AiConfig) -> Self {
        let backends: Vec<Arc<dyn GenerativeBackend>> = config
            .keys()
            .into_iter()
            .flat_map(|key| {
                ApiVersion::ORDERED.into_iter().map(move |version| {
                    Arc::new(GeminiProvider::new(key.clone(), version, config.base_url.clone()))
                        as Arc<dyn GenerativeBackend>
                })
            })
            .collect();

        info!(
            endpoint_count = backends.len(),
            model_count = config.models.len(),
            "Initialized Gemini client"
        );

        Self::from_backends(backends, config.models.clone())
    }

    pub fn from_backends(backends: Vec<Arc<dyn GenerativeBackend>>, models: Vec<String>) -> Self {
        let endpoints = backends
            .into_iter()
            .map(|backend| Endpoint {
                label: backend.label(),
                backend,
            })
            .collect();

        Self {
            endpoints: Arc::new(endpoints),
            models: Arc::new(models),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoints.is_empty() && !self.models.is_empty()
    }

    pub fn combination_count(&self) -> usize {
        self.endpoints.len() * self.models.len()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Try every endpoint and model until one answers.
    ///
    /// When every combination fails the error is `RateLimited` if any attempt
    /// was rate limited, so the caller's retry loop can try the whole chain again.
    pub async fn generate(&self, operation: &str, prompt: &str) -> Result<String, AiError> {
        if !self.is_configured() {
            return Err(AiError::NotConfigured);
        }

        let mut last_rate_limit: Option<AiError> = None;

        for endpoint in self.endpoints.iter() {
            for model in self.models.iter() {
                let started = Instant::now();
                match endpoint.backend.generate(model, prompt).await {
                    Ok(text) => {
                        log_ai_operation!(
                            success,
                            operation,
                            endpoint = endpoint.label,
                            model = model,
                            duration_ms = started.elapsed().as_millis() as u64
                        );
                        return Ok(text);
                    }
                    Err(err) => {
                        log_ai_operation!(
                            failure,
                            operation,
                            endpoint = endpoint.label,
                            model = model,
                            error = err
                        );
                        if err.is_rate_limited() {
                            last_rate_limit = Some(err);
                        }
                    }
                }
            }
        }

        Err(last_rate_limit.unwrap_or_else(|| {
            AiError::Unknown(format!(
                "all {} endpoint/model combinations failed",
                self.combination_count()
            ))
        }))
    }
}

/// Everything an AI-backed operation needs, passed explicitly instead of held globally
#[derive(Clone)]
pub struct AiContext {
    llm: LLMService,
    gate: RateGate,
    retry: RetryPolicy,
}

impl AiContext {
    pub fn new(llm: LLMService, gate: RateGate, retry: RetryPolicy) -> Self {
        Self { llm, gate, retry }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(
            LLMService::from_config(config),
            RateGate::new(config.rate_limit()),
            config.retry_policy(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Run a prompt through the shared gate with rate-limit retries
    pub async fn generate(&self, operation: &str, prompt: &str) -> Result<String, AiError> {
        if !self.is_configured() {
            debug!(operation = operation, "AI not configured, skipping call");
            return Err(AiError::NotConfigured);
        }

        retry_with_backoff(&self.gate, &self.retry, operation, || {
            self.llm.generate(operation, prompt)
        })
        .await
    }
}
