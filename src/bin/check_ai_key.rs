use anyhow::Result;
use std::process::ExitCode;

use netescola::config::{mask_sensitive_data, AiConfig};
use netescola::llm_providers::{ApiVersion, GeminiProvider, GenerativeBackend};

const PROBE_PROMPT: &str = "Responda com a palavra OK se você estiver funcionando.";

/// Probe every configured model on both API versions until one answers.
///
/// Exit codes: 0 when a model responded, 2 when none did, 1 without a key.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let config = AiConfig::from_env()?;
    let Some(api_key) = config.keys().into_iter().next() else {
        eprintln!("No Gemini API key provided. Set GEMINI_API_KEY or GEMINI_API_KEY_BACKUP in the environment.");
        return Ok(ExitCode::from(1));
    };

    println!("Testing Gemini key {}...", mask_sensitive_data(&api_key));

    for model in &config.models {
        for version in ApiVersion::ORDERED {
            let provider = GeminiProvider::new(api_key.clone(), version, config.base_url.clone());
            match provider.generate(model, PROBE_PROMPT).await {
                Ok(text) => {
                    println!("OK   {} ({}): {}", model, version.as_str(), text.trim());
                    println!("At least one model responded.");
                    return Ok(ExitCode::SUCCESS);
                }
                Err(e) => eprintln!("FAIL {} ({}): {}", model, version.as_str(), e),
            }
        }
    }

    eprintln!("No model responded with the provided key.");
    Ok(ExitCode::from(2))
}
