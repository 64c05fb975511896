use netescola::config::{Config, DEFAULT_CHANNEL_ID_MEDIO, DEFAULT_GEMINI_MODELS};

const VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "API_KEY",
    "GEMINI_API_KEY_BACKUP",
    "GEMINI_MODELS",
    "YOUTUBE_API_KEY",
    "YOUTUBE_CHANNEL_ID_EM",
    "YOUTUBE_CHANNEL_ID_EF",
    "VIDEO_LIVE_CHECK",
    "VIDEO_SYNTHETIC_FAILURE_RATE",
    "AI_MAX_RETRIES",
    "PORT",
];

fn clear_vars() {
    for name in VARS {
        unsafe { std::env::remove_var(name) };
    }
}

// Environment variables are process-wide, so every case lives in one test
#[test]
fn test_config_from_env() {
    clear_vars();

    let config = Config::from_env().unwrap();
    assert!(config.ai.keys().is_empty());
    assert_eq!(config.ai.models.len(), DEFAULT_GEMINI_MODELS.len());
    assert_eq!(config.ai.max_retries, 3);
    assert_eq!(config.youtube.channel_id_medio, DEFAULT_CHANNEL_ID_MEDIO);
    assert_eq!(config.youtube.channel_id_fundamental, DEFAULT_CHANNEL_ID_MEDIO);
    assert!(!config.validation.live_check);
    assert_eq!(config.validation.synthetic_failure_rate, 0.0);
    assert_eq!(config.server.port, 3000);
    assert!(config.validate().is_ok());

    unsafe {
        std::env::set_var("API_KEY", "key-from-alias");
        std::env::set_var("GEMINI_API_KEY_BACKUP", "backup-key");
        std::env::set_var("GEMINI_MODELS", "gemini-2.5-flash, ,gemini-1.5-pro-latest");
        std::env::set_var("YOUTUBE_API_KEY", "yt-key");
        std::env::set_var("YOUTUBE_CHANNEL_ID_EF", "UC_FUNDAMENTAL");
        std::env::set_var("AI_MAX_RETRIES", "5");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.ai.keys(), vec!["key-from-alias".to_string(), "backup-key".to_string()]);
    assert_eq!(config.ai.models, vec!["gemini-2.5-flash", "gemini-1.5-pro-latest"]);
    assert_eq!(config.ai.retry_policy().max_retries, 5);
    assert_eq!(config.youtube.channel_id_fundamental, "UC_FUNDAMENTAL");
    assert!(config.validation.live_check);

    // Same key twice is only tried once
    unsafe { std::env::set_var("GEMINI_API_KEY_BACKUP", "key-from-alias") };
    let config = Config::from_env().unwrap();
    assert_eq!(config.ai.keys().len(), 1);

    unsafe { std::env::set_var("VIDEO_SYNTHETIC_FAILURE_RATE", "1.5") };
    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());

    unsafe { std::env::set_var("PORT", "not-a-port") };
    assert!(Config::from_env().is_err());

    unsafe { std::env::set_var("AI_MAX_RETRIES", "many") };
    unsafe { std::env::remove_var("PORT") };
    assert!(Config::from_env().is_err());

    clear_vars();
}
