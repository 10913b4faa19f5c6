//! Router configuration
//!
//! Loaded from TOML (`meal_router.toml` in the working directory, or
//! `<config dir>/meal-router/config.toml`), then overridden from the
//! environment. Every field has a default so an absent file is fine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "meal_router.toml";

/// Directory name within the platform config/data dirs
const APP_SUBDIR: &str = "meal-router";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// Text-generation service settings (`[llm]` section)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Soft timeout; must stay below the platform's response deadline
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Optional prompt template file; `{{QUERY}}` is substituted
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
}

fn default_enabled() -> bool { true }
fn default_base_url() -> String { "http://localhost:8000/v1".to_string() }
fn default_model() -> String { "openai/gpt-oss-20b".to_string() }
fn default_timeout_ms() -> u64 { 800 }
fn default_max_tokens() -> u32 { 150 }
fn default_top_p() -> f32 { 1.0 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: default_top_p(),
            prompt_file: None,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.base_url.trim().is_empty()
    }
}

/// Preference store settings (`[preferences]` section)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl PreferencesConfig {
    /// Configured path, or `<data dir>/meal-router/preferences.json`
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_SUBDIR)
                .join("preferences.json")
        })
    }
}

impl RouterConfig {
    /// Load configuration from `explicit` if given, else from the first
    /// default location that exists, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_paths().into_iter().find(|p| p.exists()),
        };

        let mut config = match path {
            Some(ref p) => {
                tracing::debug!(path = %p.display(), "loading router config");
                Self::from_file(p)?
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                RouterConfig::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid router config TOML")
    }

    /// Apply `MEAL_ROUTER_LLM_*` environment variables over file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("MEAL_ROUTER_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = env::var("MEAL_ROUTER_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = env::var("MEAL_ROUTER_LLM_API_KEY") {
            if !v.is_empty() {
                self.llm.api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("MEAL_ROUTER_LLM_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => self.llm.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid MEAL_ROUTER_LLM_TIMEOUT_MS"),
            }
        }
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![env::current_dir()
        .map(|p| p.join(LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| PathBuf::from(LOCAL_CONFIG_FILE))];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_SUBDIR).join("config.toml"));
    }
    paths
}
