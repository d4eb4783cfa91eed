use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::loan::LoanTypeCode;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub endpoints: EndpointsConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// One provider base URL per loan type. Unset entries are allowed here and
/// rejected by the router at search time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointsConfig {
    pub consumer_url: Option<String>,
    pub housing_url: Option<String>,
    pub vehicle_url: Option<String>,
}

impl EndpointsConfig {
    pub fn url_for(&self, loan_type: LoanTypeCode) -> Option<&str> {
        match loan_type {
            LoanTypeCode::Consumer => self.consumer_url.as_deref(),
            LoanTypeCode::Housing => self.housing_url.as_deref(),
            LoanTypeCode::Vehicle => self.vehicle_url.as_deref(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub device_header: String,
    pub device_id: String,
    /// Applies to the loan provider client only.
    pub accept_invalid_certs: bool,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub consumer_url: Option<String>,
    pub housing_url: Option<String>,
    pub vehicle_url: Option<String>,
    pub accept_invalid_certs: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_CONFIG_FILE: &str = "loanscout.toml";
pub const NESTED_CONFIG_FILE: &str = "config/loanscout.toml";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.1,
                max_tokens: 1000,
                timeout_secs: 30,
            },
            endpoints: EndpointsConfig::default(),
            http: HttpConfig {
                device_header: "Device".to_string(),
                device_id: "1".to_string(),
                accept_invalid_certs: true,
                timeout_secs: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(endpoints) = patch.endpoints {
            if let Some(consumer_url) = endpoints.consumer_url {
                self.endpoints.consumer_url = Some(consumer_url);
            }
            if let Some(housing_url) = endpoints.housing_url {
                self.endpoints.housing_url = Some(housing_url);
            }
            if let Some(vehicle_url) = endpoints.vehicle_url {
                self.endpoints.vehicle_url = Some(vehicle_url);
            }
        }

        if let Some(http) = patch.http {
            if let Some(device_header) = http.device_header {
                self.http.device_header = device_header;
            }
            if let Some(device_id) = http.device_id {
                self.http.device_id = device_id;
            }
            if let Some(accept_invalid_certs) = http.accept_invalid_certs {
                self.http.accept_invalid_certs = accept_invalid_certs;
            }
            if let Some(timeout_secs) = http.timeout_secs {
                self.http.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LOANSCOUT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("LOANSCOUT_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LOANSCOUT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LOANSCOUT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LOANSCOUT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("LOANSCOUT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("LOANSCOUT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("LOANSCOUT_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("LOANSCOUT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LOANSCOUT_LLM_TIMEOUT_SECS", &value)?;
        }

        for loan_type in LoanTypeCode::ALL {
            let [primary, legacy] = endpoint_env_keys(loan_type);
            if let Some(value) = read_env(primary).or_else(|| read_env(legacy)) {
                *self.endpoint_slot(loan_type) = Some(value);
            }
        }

        if let Some(value) = read_env("LOANSCOUT_HTTP_DEVICE_HEADER") {
            self.http.device_header = value;
        }
        if let Some(value) = read_env("LOANSCOUT_HTTP_DEVICE_ID") {
            self.http.device_id = value;
        }
        if let Some(value) = read_env("LOANSCOUT_HTTP_ACCEPT_INVALID_CERTS") {
            self.http.accept_invalid_certs =
                parse_bool("LOANSCOUT_HTTP_ACCEPT_INVALID_CERTS", &value)?;
        }
        if let Some(value) = read_env("LOANSCOUT_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = Some(parse_u64("LOANSCOUT_HTTP_TIMEOUT_SECS", &value)?);
        }

        let log_level =
            read_env("LOANSCOUT_LOGGING_LEVEL").or_else(|| read_env("LOANSCOUT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LOANSCOUT_LOGGING_FORMAT").or_else(|| read_env("LOANSCOUT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(consumer_url) = overrides.consumer_url {
            self.endpoints.consumer_url = Some(consumer_url);
        }
        if let Some(housing_url) = overrides.housing_url {
            self.endpoints.housing_url = Some(housing_url);
        }
        if let Some(vehicle_url) = overrides.vehicle_url {
            self.endpoints.vehicle_url = Some(vehicle_url);
        }
        if let Some(accept_invalid_certs) = overrides.accept_invalid_certs {
            self.http.accept_invalid_certs = accept_invalid_certs;
        }
    }

    fn endpoint_slot(&mut self, loan_type: LoanTypeCode) -> &mut Option<String> {
        match loan_type {
            LoanTypeCode::Consumer => &mut self.endpoints.consumer_url,
            LoanTypeCode::Housing => &mut self.endpoints.housing_url,
            LoanTypeCode::Vehicle => &mut self.endpoints.vehicle_url,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_endpoints(&self.endpoints)?;
        validate_http(&self.http)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Environment keys for a loan type's endpoint: the namespaced key first,
/// then the gateway key used by existing deployments.
pub fn endpoint_env_keys(loan_type: LoanTypeCode) -> [&'static str; 2] {
    match loan_type {
        LoanTypeCode::Consumer => {
            ["LOANSCOUT_ENDPOINTS_CONSUMER_URL", "GATEWAY_API_CONSUMERLOAN_LIST"]
        }
        LoanTypeCode::Housing => {
            ["LOANSCOUT_ENDPOINTS_HOUSING_URL", "GATEWAY_API_HOUSINGLOAN_LIST"]
        }
        LoanTypeCode::Vehicle => {
            ["LOANSCOUT_ENDPOINTS_VEHICLE_URL", "GATEWAY_API_VEHICLELOAN_LIST"]
        }
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for gemini/openai providers (set LOANSCOUT_LLM_API_KEY or GEMINI_API_KEY)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_endpoints(endpoints: &EndpointsConfig) -> Result<(), ConfigError> {
    for loan_type in LoanTypeCode::ALL {
        let Some(url) = endpoints.url_for(loan_type) else {
            continue;
        };
        if !url.trim().is_empty() && !is_http_url(url) {
            return Err(ConfigError::Validation(format!(
                "endpoints.{}_url must start with http:// or https://",
                loan_type.code()
            )));
        }
    }

    Ok(())
}

fn validate_http(http: &HttpConfig) -> Result<(), ConfigError> {
    let header = http.device_header.trim();
    let valid_header = !header.is_empty()
        && header.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_');
    if !valid_header {
        return Err(ConfigError::Validation(
            "http.device_header must be a non-empty token of letters, digits, `-` or `_`"
                .to_string(),
        ));
    }

    if http.timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "http.timeout_secs must be greater than zero when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    endpoints: Option<EndpointsPatch>,
    http: Option<HttpPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointsPatch {
    consumer_url: Option<String>,
    housing_url: Option<String>,
    vehicle_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpPatch {
    device_header: Option<String>,
    device_id: Option<String>,
    accept_invalid_certs: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
