use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub brainstorm: BrainstormConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_request_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "giftwise.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrainstormConfig {
    /// Hard cap on tokens the generation service may emit per request.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Retries after the first attempt, for transient provider errors only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base wait before the first retry; doubled on each further attempt.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,
}

impl Default for BrainstormConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
        }
    }
}

fn default_max_output_tokens() -> u32 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_secs() -> u64 {
    2
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
