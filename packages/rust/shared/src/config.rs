//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Language-model endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Outreach wording.
    #[serde(default)]
    pub outreach: OutreachConfig,

    /// Interval worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Minimum ICP score a lead needs to be kept.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Path to the ICP JSON file.
    #[serde(default = "default_icp_path")]
    pub icp_path: String,

    /// Path to the enrichment CSV table.
    #[serde(default = "default_enrichment_path")]
    pub enrichment_path: String,

    /// Path to the run history database.
    #[serde(default = "default_history_db")]
    pub history_db: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            icp_path: default_icp_path(),
            enrichment_path: default_enrichment_path(),
            history_db: default_history_db(),
        }
    }
}

fn default_min_score() -> f64 {
    0.3
}
fn default_icp_path() -> String {
    "icp.json".into()
}
fn default_enrichment_path() -> String {
    "enrichment.csv".into()
}
fn default_history_db() -> String {
    "~/.leadscout/history.db".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible base URL (`/chat/completions` is appended).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for extraction and outreach.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.2
}

/// `[outreach]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Product or team name mentioned in outreach messages.
    #[serde(default = "default_product_name")]
    pub product_name: String,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
        }
    }
}

fn default_product_name() -> String {
    "our platform".into()
}

/// `[worker]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Run interval: empty runs once, `"60"` is minutes, `"01:00:00"` is HH:MM:SS.
    #[serde(default)]
    pub interval: String,

    /// Directory polled for newsletter files.
    #[serde(default)]
    pub inbox_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline settings, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Minimum ICP score to keep a lead.
    pub min_score: f64,
    /// ICP JSON path.
    pub icp_path: PathBuf,
    /// Enrichment CSV path.
    pub enrichment_path: PathBuf,
    /// Product name used in outreach.
    pub product_name: String,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_score: config.defaults.min_score,
            icp_path: expand_home(&config.defaults.icp_path),
            enrichment_path: expand_home(&config.defaults.enrichment_path),
            product_name: config.outreach.product_name.clone(),
        }
    }
}

impl PipelineSettings {
    /// Reject thresholds outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        validate_min_score(self.min_score)
    }
}

/// Check that a minimum score lies in [0, 1].
pub fn validate_min_score(min_score: f64) -> Result<()> {
    if (0.0..=1.0).contains(&min_score) {
        Ok(())
    } else {
        Err(LeadScoutError::config(format!(
            "min_score {min_score} outside [0, 1]"
        )))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_min_score(config.defaults.min_score)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the LLM API key from the configured env var.
///
/// A missing key is not fatal for a run; callers fall back to offline oracles.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(LeadScoutError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("min_score"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.min_score, 0.3);
        assert_eq!(parsed.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.llm.timeout_secs, 60);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[defaults]
icp_path = "/etc/leadscout/icp.json"

[worker]
interval = "60"
inbox_dir = "/var/mail/newsletters"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.icp_path, "/etc/leadscout/icp.json");
        assert_eq!(config.defaults.enrichment_path, "enrichment.csv");
        assert_eq!(config.worker.interval, "60");
        assert_eq!(config.outreach.product_name, "our platform");
    }

    #[test]
    fn pipeline_settings_from_app_config() {
        let app = AppConfig::default();
        let settings = PipelineSettings::from(&app);
        assert_eq!(settings.min_score, 0.3);
        assert_eq!(settings.icp_path, PathBuf::from("icp.json"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn min_score_out_of_range_is_config_error() {
        let err = validate_min_score(1.2).unwrap_err();
        assert!(err.is_fatal());
        assert!(validate_min_score(f64::NAN).is_err());
        assert!(validate_min_score(0.0).is_ok());
        assert!(validate_min_score(1.0).is_ok());
    }

    #[test]
    fn load_config_rejects_bad_threshold() {
        let path = std::env::temp_dir().join(format!(
            "leadscout_cfg_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[defaults]\nmin_score = 3.0\n").unwrap();
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn api_key_resolution() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "LS_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("data/icp.json"), PathBuf::from("data/icp.json"));
    }
}
