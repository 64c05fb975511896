use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{error, info};

use crate::config::mask_sensitive_data;
use crate::errors::AiError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// A single generative-AI endpoint: one credential against one API version.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AiError>;

    /// Human-readable identity for logs; never contains the full credential
    fn label(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    V1Beta,
    V1,
}

impl ApiVersion {
    /// Versions in the order they are tried
    pub const ORDERED: [ApiVersion; 2] = [ApiVersion::V1Beta, ApiVersion::V1];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1Beta => "v1beta",
            ApiVersion::V1 => "v1",
        }
    }
}

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_version: ApiVersion,
    base_url: String,
}

/// Gemini-specific request structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiProvider {
    /// Each provider owns its HTTP client; providers are never shared across credentials.
    pub fn new(api_key: String, api_version: ApiVersion, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_version,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

#[async_trait]
impl GenerativeBackend for GeminiProvider {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AiError> {
        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: 2048,
            },
        };

        let url = format!(
            "{}/{}/models/{}:generateContent?key={}",
            self.base_url,
            self.api_version.as_str(),
            model,
            self.api_key
        );

        info!(
            endpoint = %self.label(),
            model = %model,
            prompt_length = prompt.len(),
            "Making Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                endpoint = %self.label(),
                model = %model,
                status = %status,
                error = %error_text,
                "Gemini API request failed"
            );
            return Err(AiError::from_status(status.as_u16(), &error_text));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AiError::InvalidResponse("No text in Gemini response".to_string()))?;

        info!(
            endpoint = %self.label(),
            model = %model,
            response_length = text.len(),
            "Successfully received Gemini response"
        );

        Ok(text)
    }

    fn label(&self) -> String {
        format!("{}@{}", mask_sensitive_data(&self.api_key), self.api_version.as_str())
    }
}

fn code_fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("code fence regex is valid")
    })
}

/// Centralized JSON response parser for model output
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Remove a surrounding markdown code fence (```json ... ```), if any
    pub fn strip_code_fence(content: &str) -> String {
        let trimmed = content.trim();
        match code_fence_regex().captures(trimmed).and_then(|caps| caps.get(2)) {
            Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim().to_string(),
            _ => trimmed.to_string(),
        }
    }

    /// Parse JSON response into a specific type
    pub fn parse_json_response<T>(&self, content: &str) -> Result<T, AiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let json_content = Self::strip_code_fence(content);
        serde_json::from_str::<T>(&json_content)
            .map_err(|e| AiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        let content = "```json\n[{\"a\": 1}]\n```";
        assert_eq!(JsonResponseParser::strip_code_fence(content), "[{\"a\": 1}]");
    }

    #[test]
    fn test_strip_plain_fence_and_whitespace() {
        let content = "  ```\n[1, 2]\n```  ";
        assert_eq!(JsonResponseParser::strip_code_fence(content), "[1, 2]");
    }

    #[test]
    fn test_unfenced_content_is_trimmed_only() {
        assert_eq!(JsonResponseParser::strip_code_fence("  [1]\n"), "[1]");
    }

    #[test]
    fn test_parse_json_response_reports_invalid_response() {
        let parser = JsonResponseParser;
        let parsed: Result<Vec<u32>, AiError> = parser.parse_json_response("not json at all");
        assert!(matches!(parsed, Err(AiError::InvalidResponse(_))));

        let parsed: Vec<u32> = parser.parse_json_response("```json\n[3, 4]\n```").unwrap();
        assert_eq!(parsed, vec![3, 4]);
    }

    #[test]
    fn test_provider_label_masks_key() {
        let provider = GeminiProvider::new("AIzaSyExampleKey1234".to_string(), ApiVersion::V1, None);
        let label = provider.label();
        assert!(label.ends_with("@v1"));
        assert!(!label.contains("SyExampleKey"));
    }
}
