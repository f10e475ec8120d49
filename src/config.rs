use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openrouter,
    Ollama,
    Openai,
    Gemini,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
            LlmProvider::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return &self.base_url;
        }
        match self.provider {
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Model name, or the provider's small default model when unset.
    pub fn effective_model(&self) -> &str {
        if !self.model.is_empty() {
            return &self.model;
        }
        match self.provider {
            LlmProvider::Openrouter => "google/gemini-2.5-flash",
            LlmProvider::Ollama => "llama3.2",
            LlmProvider::Openai => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-2.5-flash",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default)]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub support_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub engine_id: String,
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Knobs that distinguish one deployment of the search pipeline from another.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    #[serde(default = "default_language_qualifier")]
    pub language_qualifier: String,
    #[serde(default = "default_channel_suffix")]
    pub channel_suffix: String,
    #[serde(default = "default_image_suffix")]
    pub image_suffix: String,
    #[serde(default = "default_true")]
    pub spoiler_in_groups: bool,
    #[serde(default = "default_max_group_text_len")]
    pub max_group_text_len: usize,
    /// Ask the LLM to write the search query instead of the fixed template
    #[serde(default = "default_true")]
    pub ai_query: bool,
    #[serde(default = "default_ignore_words")]
    pub ignore_words: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            language_qualifier: default_language_qualifier(),
            channel_suffix: default_channel_suffix(),
            image_suffix: default_image_suffix(),
            spoiler_in_groups: true,
            max_group_text_len: default_max_group_text_len(),
            ai_query: true,
            ignore_words: default_ignore_words(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// Public URL Telegram delivers updates to
    pub url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_max_tokens() -> u32 {
    64
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_language_qualifier() -> String {
    "Hindi Dubbed".to_string()
}

fn default_channel_suffix() -> String {
    "Telegram Channel site:t.me".to_string()
}

fn default_image_suffix() -> String {
    "poster wallpaper hd".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_group_text_len() -> usize {
    50
}

fn default_ignore_words() -> Vec<String> {
    [
        "hi", "hello", "hey", "gm", "gn", "help", "start", "thanks", "thank you", "ok", "okay",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("users.db")
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if config.profile.max_group_text_len == 0 {
            anyhow::bail!("profile.max_group_text_len must be greater than zero");
        }

        Ok(config)
    }
}
