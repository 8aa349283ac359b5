use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Manages the JSON config file in the per-user config directory
pub struct ConfigStore {
    base_dir: PathBuf,
}

impl ConfigStore {
    /// Create a new ConfigStore, initializing the base directory if needed
    pub fn new() -> Result<Self, ConfigError> {
        let base_dir = Self::get_app_data_dir()?;
        Self::new_with_base(base_dir)
    }

    /// Create a ConfigStore with a custom base directory (for testing)
    pub fn new_with_base(base_dir: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Get the app data directory path
    fn get_app_data_dir() -> Result<PathBuf, ConfigError> {
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .map(|p| PathBuf::from(p).join("vibe-orchestrator"))
                .map_err(|_| ConfigError::InvalidPath("APPDATA not set".to_string()))
        }
        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .map(|p| PathBuf::from(p).join(".config").join("vibe-orchestrator"))
                .map_err(|_| ConfigError::InvalidPath("HOME not set".to_string()))
        }
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Load the app config, writing the defaults on first use
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            let default_config = AppConfig::default();
            self.save_config(&default_config)?;
            tracing::info!("Wrote default config to {:?}", config_path);
            return Ok(default_config);
        }

        let json = fs::read_to_string(config_path)?;
        let config: AppConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save the app config
    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(self.config_path(), json)?;
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub clis: HashMap<String, CliConfig>,
    #[serde(default = "default_cli_name")]
    pub default_cli: String,
    /// Working directory for spawned CLIs; inherits ours when unset
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Emit ANSI colors even when stdout is not a terminal
    #[serde(default = "default_true")]
    pub force_color: bool,
}

fn default_cli_name() -> String {
    "claude".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut clis = HashMap::new();
        clis.insert(
            "claude".to_string(),
            CliConfig {
                command: "claude".to_string(),
                base_args: vec![],
                prompt_flag: Some("-p".to_string()),
                prompt_via: PromptInput::Argument,
                verbose_flag: Some("--verbose".to_string()),
                model_flag: Some("--model".to_string()),
                default_model: None,
                env: None,
            },
        );

        Self {
            clis,
            default_cli: default_cli_name(),
            working_dir: None,
            orchestration: OrchestrationConfig::default(),
            api: ApiConfig::default(),
            force_color: true,
        }
    }
}

/// How a CLI receives its prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptInput {
    #[default]
    Argument,
    Stdin,
}

/// CLI configuration for a specific assistant CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub command: String,
    #[serde(default)]
    pub base_args: Vec<String>,
    pub prompt_flag: Option<String>,
    #[serde(default)]
    pub prompt_via: PromptInput,
    pub verbose_flag: Option<String>,
    pub model_flag: Option<String>,
    pub default_model: Option<String>,
    pub env: Option<HashMap<String, String>>,
}

/// Tunables for the mode state machines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub max_iterations: u32,
    pub quality_threshold: f64,
    /// Pause between sequential steps of loop and hivemind sessions
    pub step_delay_ms: u64,
    /// Kill a step's subprocess after this long; no limit when unset
    pub step_timeout_secs: Option<u64>,
    pub max_sessions: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            quality_threshold: 0.9,
            step_delay_ms: 1000,
            step_timeout_secs: None,
            max_sessions: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 18900,
        }
    }
}
