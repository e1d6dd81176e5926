// ABOUTME: Tests for configuration loading and validation
// ABOUTME: Verifies TOML parsing, env var overrides, explicit paths and required field validation

use lmgram::config::{Config, LogFormat};
use lmgram::inference::TranscriptFormat;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for var in [
        "LMGRAM_CONFIG_PATH",
        "TELEGRAM_BOT_TOKEN",
        "INFERENCE_URL",
        "INFERENCE_MODEL",
        "INFERENCE_TEMPERATURE",
        "INFERENCE_TIMEOUT_SECS",
        "INFERENCE_API_KEY",
        "LOG_FORMAT",
        "METRICS_LISTEN",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[telegram]
bot_token = "123:abc"

[inference]
url = "http://gpu-box:8080/v1/chat/completions"
model = "mistral-7b"
temperature = 0.2
system_prompt = "Answer briefly."
transcript_format = "messages"

[logging]
format = "json"
file = true

[metrics]
listen = "127.0.0.1:9187"
"#,
    );
    std::env::set_var("LMGRAM_CONFIG_PATH", &path);

    let config = Config::load().unwrap();

    assert_eq!(config.telegram.bot_token, "123:abc");
    assert_eq!(config.inference.url, "http://gpu-box:8080/v1/chat/completions");
    assert_eq!(config.inference.model, "mistral-7b");
    assert!((config.inference.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.inference.system_prompt, "Answer briefly.");
    assert_eq!(config.inference.transcript_format, TranscriptFormat::Messages);
    assert_eq!(config.inference.timeout_secs, 120);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.logging.file);
    assert_eq!(config.metrics.listen.unwrap().port(), 9187);

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_env_var_overrides() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[telegram]
bot_token = "from-file"

[inference]
model = "file-model"
"#,
    );
    std::env::set_var("LMGRAM_CONFIG_PATH", &path);
    std::env::set_var("TELEGRAM_BOT_TOKEN", "from-env");
    std::env::set_var("INFERENCE_MODEL", "env-model");
    std::env::set_var("INFERENCE_TEMPERATURE", "1.5");
    std::env::set_var("INFERENCE_API_KEY", "sk-env");
    std::env::set_var("LOG_FORMAT", "json");

    let config = Config::load().unwrap();

    assert_eq!(config.telegram.bot_token, "from-env");
    assert_eq!(config.inference.model, "env-model");
    assert!((config.inference.temperature - 1.5).abs() < f32::EPSILON);
    assert_eq!(config.inference.api_key.as_deref(), Some("sk-env"));
    assert_eq!(config.logging.format, LogFormat::Json);

    // The bot token is scrubbed from the environment once read
    assert!(std::env::var("TELEGRAM_BOT_TOKEN").is_err());

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_from_env_only() {
    clear_config_env_vars();
    // Point the search at something that does not exist
    std::env::set_var("LMGRAM_CONFIG_PATH", "/nonexistent/lmgram/config.toml");
    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:env");

    let config = Config::load().unwrap();

    assert_eq!(config.telegram.bot_token, "123:env");
    assert_eq!(config.inference.url, "http://localhost:1234/v1/chat/completions");
    assert_eq!(config.inference.model, "local-model");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_missing_bot_token_is_rejected() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[inference]\nmodel = \"m\"\n");

    let err = Config::load_from(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("bot_token"), "got: {err}");
}

#[test]
#[serial]
fn test_invalid_env_values_are_rejected() {
    clear_config_env_vars();
    std::env::set_var("LMGRAM_CONFIG_PATH", "/nonexistent/lmgram/config.toml");
    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:env");
    std::env::set_var("INFERENCE_TEMPERATURE", "warm");

    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("INFERENCE_TEMPERATURE"), "got: {err}");

    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:env");
    std::env::set_var("INFERENCE_TEMPERATURE", "0.5");
    std::env::set_var("METRICS_LISTEN", "not-an-address");
    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("METRICS_LISTEN"), "got: {err}");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_explicit_path_must_exist() {
    clear_config_env_vars();
    let err = Config::load_from(Some(std::path::Path::new("/nonexistent/explicit.toml")))
        .unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env_path() {
    clear_config_env_vars();
    let env_dir = tempfile::tempdir().unwrap();
    let env_path = write_config(&env_dir, "[telegram]\nbot_token = \"env-file\"\n");
    let cli_dir = tempfile::tempdir().unwrap();
    let cli_path = write_config(&cli_dir, "[telegram]\nbot_token = \"cli-file\"\n");
    std::env::set_var("LMGRAM_CONFIG_PATH", &env_path);

    let config = Config::load_from(Some(&cli_path)).unwrap();
    assert_eq!(config.telegram.bot_token, "cli-file");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_debug_output_redacts_secrets() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "[telegram]\nbot_token = \"123:very-secret\"\n\n[inference]\napi_key = \"sk-hidden\"\n",
    );

    let config = Config::load_from(Some(&path)).unwrap();
    let printed = format!("{:#?}", config);

    assert!(!printed.contains("very-secret"));
    assert!(!printed.contains("sk-hidden"));
    assert!(printed.contains("[REDACTED]"));
}
