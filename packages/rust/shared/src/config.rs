//! Application configuration for lessonpath.
//!
//! User config lives at `~/.lessonpath/lessonpath.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LessonpathError, Result};
use crate::types::ModelProfile;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lessonpath.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lessonpath";

// ---------------------------------------------------------------------------
// Config structs (matching lessonpath.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenRouter connection settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Profile → provider model id table.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Which profile each enrichment facet uses.
    #[serde(default)]
    pub enrichment: EnrichmentProfilesConfig,

    /// Rate pacing between completion calls.
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `X-Title`.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Sent as `HTTP-Referer` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            app_name: default_app_name(),
            site_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenRouterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Chat completions endpoint derived from `base_url`.
    pub fn completions_url(&self) -> Result<url::Url> {
        let base = url::Url::parse(self.base_url.trim_end_matches('/')).map_err(|e| {
            LessonpathError::config(format!("invalid openrouter.base_url '{}': {e}", self.base_url))
        })?;
        let joined = format!("{}/chat/completions", base.as_str().trim_end_matches('/'));
        url::Url::parse(&joined)
            .map_err(|e| LessonpathError::config(format!("invalid completions URL '{joined}': {e}")))
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_app_name() -> String {
    "Learning Roadmap Generator".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[models]` section: the capability-tier table injected into the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_fast_model")]
    pub fast: String,
    #[serde(default = "default_balanced_model")]
    pub balanced: String,
    #[serde(default = "default_smart_model")]
    pub smart: String,
    #[serde(default = "default_vision_model")]
    pub vision: String,
    #[serde(default = "default_long_context_model")]
    pub long_context: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            balanced: default_balanced_model(),
            smart: default_smart_model(),
            vision: default_vision_model(),
            long_context: default_long_context_model(),
        }
    }
}

impl ModelsConfig {
    /// Provider model id for a capability tier.
    pub fn resolve(&self, profile: ModelProfile) -> &str {
        match profile {
            ModelProfile::Fast => &self.fast,
            ModelProfile::Balanced => &self.balanced,
            ModelProfile::Smart => &self.smart,
            ModelProfile::Vision => &self.vision,
            ModelProfile::LongContext => &self.long_context,
        }
    }
}

fn default_fast_model() -> String {
    "nvidia/nemotron-3-nano-30b-a3b:free".into()
}
fn default_balanced_model() -> String {
    "mistralai/devstral-2512:free".into()
}
fn default_smart_model() -> String {
    "xiaomi/mimo-v2-flash:free".into()
}
fn default_vision_model() -> String {
    "mistralai/pixtral-12b:free".into()
}
fn default_long_context_model() -> String {
    "google/gemini-pro-1.5:free".into()
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentProfilesConfig {
    #[serde(default = "default_profile")]
    pub topic_profile: ModelProfile,
    #[serde(default = "default_profile")]
    pub prerequisites_profile: ModelProfile,
    #[serde(default = "default_profile")]
    pub pathway_profile: ModelProfile,
}

impl Default for EnrichmentProfilesConfig {
    fn default() -> Self {
        Self {
            topic_profile: default_profile(),
            prerequisites_profile: default_profile(),
            pathway_profile: default_profile(),
        }
    }
}

fn default_profile() -> ModelProfile {
    ModelProfile::Smart
}

/// `[pacing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Items between the longer batch pauses.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause after every `batch_size` items.
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Pause after an item that made at least one live call.
    #[serde(default = "default_item_pause_ms")]
    pub item_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            item_pause_ms: default_item_pause_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_batch_pause_ms() -> u64 {
    2_000
}
fn default_item_pause_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lessonpath/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LessonpathError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lessonpath/lessonpath.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LessonpathError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LessonpathError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.pacing.batch_size == 0 {
        return Err(LessonpathError::config("pacing.batch_size must be at least 1"));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LessonpathError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LessonpathError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LessonpathError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the OpenRouter API key from the configured env var.
///
/// Called before any input is processed so a missing credential halts the run
/// instead of degrading every item to fallbacks.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(LessonpathError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
