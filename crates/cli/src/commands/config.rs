use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use loanscout_core::config::{endpoint_env_keys, resolve_config_path, AppConfig, LoadOptions};
use loanscout_core::domain::loan::LoanTypeCode;
use secrecy::ExposeSecret;
use toml::Value;

struct FieldSources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = resolve_config_path(None);
    let sources = FieldSources { doc: load_config_file_doc(path.as_deref()), path };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        &["LOANSCOUT_LLM_PROVIDER"],
    ));
    lines.push(sources.line("llm.model", &config.llm.model, &["LOANSCOUT_LLM_MODEL"]));
    lines.push(sources.line(
        "llm.base_url",
        config.llm.base_url.as_deref().unwrap_or("<unset>"),
        &["LOANSCOUT_LLM_BASE_URL"],
    ));

    let llm_api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(sources.line(
        "llm.api_key",
        &llm_api_key,
        &["LOANSCOUT_LLM_API_KEY", "GEMINI_API_KEY"],
    ));
    lines.push(sources.line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        &["LOANSCOUT_LLM_TEMPERATURE"],
    ));
    lines.push(sources.line(
        "llm.max_tokens",
        &config.llm.max_tokens.to_string(),
        &["LOANSCOUT_LLM_MAX_TOKENS"],
    ));
    lines.push(sources.line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["LOANSCOUT_LLM_TIMEOUT_SECS"],
    ));

    for loan_type in LoanTypeCode::ALL {
        let key_path = format!("endpoints.{}_url", loan_type.code());
        lines.push(sources.line(
            &key_path,
            config.endpoints.url_for(loan_type).unwrap_or("<unset>"),
            &endpoint_env_keys(loan_type),
        ));
    }

    lines.push(sources.line(
        "http.device_header",
        &config.http.device_header,
        &["LOANSCOUT_HTTP_DEVICE_HEADER"],
    ));
    lines.push(sources.line(
        "http.device_id",
        &config.http.device_id,
        &["LOANSCOUT_HTTP_DEVICE_ID"],
    ));
    lines.push(sources.line(
        "http.accept_invalid_certs",
        &config.http.accept_invalid_certs.to_string(),
        &["LOANSCOUT_HTTP_ACCEPT_INVALID_CERTS"],
    ));
    let http_timeout = config.http.timeout_secs.map(|secs| secs.to_string());
    lines.push(sources.line(
        "http.timeout_secs",
        http_timeout.as_deref().unwrap_or("<transport default>"),
        &["LOANSCOUT_HTTP_TIMEOUT_SECS"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["LOANSCOUT_LOGGING_LEVEL", "LOANSCOUT_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["LOANSCOUT_LOGGING_FORMAT", "LOANSCOUT_LOG_FORMAT"],
    ));

    lines.join("\n")
}

impl FieldSources {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the first four characters of keys long enough to stay unguessable.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if trimmed.chars().count() >= 16 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}
