use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use flowpay_commands::llm::{
    DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MAX_TOKENS, DEFAULT_LLM_MODEL, DEFAULT_LLM_TEMPERATURE,
    DEFAULT_LLM_TIMEOUT,
};
use flowpay_commands::LlmSettings;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:5500,https://teamflowpay.vercel.app";
const DEFAULT_ALLOWED_ORIGIN_SUFFIXES: &str = ".vercel.app";
const DEFAULT_SEED_SAMPLE_DATA: bool = true;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub log_json: bool,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub allowed_origin_suffixes: Vec<String>,
    pub seed_sample_data: bool,
    pub llm: LlmSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid FLOWPAY_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let flag = |key: &str, default: bool| {
            value(key).map_or(default, |value| {
                matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
            })
        };

        let bind_addr_raw = value("FLOWPAY_BIND_ADDR")
            .or_else(|| value("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw.clone(),
                source,
            })?;

        let log_filter = value("FLOWPAY_LOG_FILTER")
            .or_else(|| value("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let environment = value("FLOWPAY_ENV")
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
            .trim()
            .to_lowercase();

        let allowed_origins = parse_csv(
            value("FLOWPAY_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );
        let allowed_origin_suffixes = parse_csv(
            value("FLOWPAY_ALLOWED_ORIGIN_SUFFIXES")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN_SUFFIXES.to_string()),
        );

        let llm = LlmSettings {
            base_url: value("FLOWPAY_LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: value("FLOWPAY_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: value("FLOWPAY_LLM_API_KEY")
                .or_else(|| value("GROQ_API_KEY"))
                .map(|key| key.trim().to_string()),
            temperature: value("FLOWPAY_LLM_TEMPERATURE")
                .and_then(|value| value.trim().parse::<f32>().ok())
                .unwrap_or(DEFAULT_LLM_TEMPERATURE),
            max_tokens: value("FLOWPAY_LLM_MAX_TOKENS")
                .and_then(|value| value.trim().parse::<u32>().ok())
                .unwrap_or(DEFAULT_LLM_MAX_TOKENS),
            timeout: value("FLOWPAY_LLM_TIMEOUT_MS")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|millis| *millis > 0)
                .map_or(DEFAULT_LLM_TIMEOUT, Duration::from_millis),
        };

        Ok(Self {
            bind_addr,
            log_filter,
            log_json: flag("FLOWPAY_LOG_JSON", false),
            environment,
            allowed_origins,
            allowed_origin_suffixes,
            seed_sample_data: flag("FLOWPAY_SEED_SAMPLE_DATA", DEFAULT_SEED_SAMPLE_DATA),
            llm,
        })
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == DEFAULT_ENVIRONMENT
    }

    /// Exact allow-list match, or a host ending in one of the allowed suffixes.
    #[must_use]
    pub fn origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            return true;
        }
        let host = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .unwrap_or(origin);
        self.allowed_origin_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
impl Config {
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            log_json: false,
            environment: "test".to_string(),
            allowed_origins: parse_csv(DEFAULT_ALLOWED_ORIGINS.to_string()),
            allowed_origin_suffixes: parse_csv(DEFAULT_ALLOWED_ORIGIN_SUFFIXES.to_string()),
            seed_sample_data: true,
            llm: LlmSettings::default(),
        }
    }
}

fn parse_csv(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{Config, ConfigError};

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("defaults parse");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert!(config.is_development());
        assert!(config.seed_sample_data);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert!(config.llm.credential().is_none());
    }

    #[test]
    fn port_is_used_when_bind_addr_is_absent() {
        let config = config_from(&[("PORT", "8080")]).expect("port parses");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");

        let config = config_from(&[("PORT", "8080"), ("FLOWPAY_BIND_ADDR", "127.0.0.1:9000")])
            .expect("bind addr parses");
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn invalid_bind_addr_is_an_error() {
        let error = config_from(&[("FLOWPAY_BIND_ADDR", "not-an-addr")]).expect_err("rejected");
        assert!(error.to_string().starts_with("invalid FLOWPAY_BIND_ADDR value 'not-an-addr'"));
    }

    #[test]
    fn llm_settings_read_groq_key_and_overrides() {
        let config = config_from(&[
            ("GROQ_API_KEY", " gsk_live "),
            ("FLOWPAY_LLM_TIMEOUT_MS", "1500"),
            ("FLOWPAY_LLM_MAX_TOKENS", "nope"),
            ("FLOWPAY_SEED_SAMPLE_DATA", "false"),
            ("FLOWPAY_ENV", "Production"),
        ])
        .expect("config parses");
        assert_eq!(config.llm.credential(), Some("gsk_live"));
        assert_eq!(config.llm.timeout, Duration::from_millis(1500));
        assert_eq!(config.llm.max_tokens, 500);
        assert!(!config.seed_sample_data);
        assert!(!config.is_development());
    }

    #[test]
    fn origins_match_list_or_suffix() {
        let config = Config::for_tests();
        assert!(config.origin_allowed("http://localhost:3000"));
        assert!(config.origin_allowed("https://flowpay-preview-123.vercel.app"));
        assert!(!config.origin_allowed("https://evil.example.com"));
        assert!(!config.origin_allowed("http://localhost:4000"));
    }
}
