use crate::models::UserConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat, Map};
use std::fs;

/// File name of the user settings inside the configuration directory
pub const USER_CONFIG_FILE: &str = "Glosor Settings.yaml";

/// Prefix of environment variables overriding settings.
///
/// Nested keys are separated by `__`, e.g. `GLOSOR_VOCABULARY__SHEET_URL`
/// or `GLOSOR_QUIZ__READ_ALOUD=true`.
pub const ENV_PREFIX: &str = "GLOSOR";

/// Configuration manager for loading and saving the YAML settings file.
///
/// Settings come from `Glosor Settings.yaml` in the configuration directory,
/// overridden by `GLOSOR_*` environment variables. Every setting has a
/// default, so neither the file nor any variable is required.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "Glosor Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join(USER_CONFIG_FILE),
            config_dir,
        })
    }

    /// Load the user configuration from the settings file and the process
    /// environment.
    ///
    /// # Returns
    /// The merged UserConfig; defaults for anything not set
    pub fn load_user_config(&self) -> Result<UserConfig> {
        self.load_user_config_with_env(None)
    }

    /// Load the user configuration with an explicit environment.
    ///
    /// `env` replaces the process environment as the source of overrides
    /// when given.
    pub fn load_user_config_with_env(&self, env: Option<Map<String, String>>) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let settings = Config::builder()
            .add_source(File::new(self.user_config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!("Loaded user config from {}", self.user_config_path);
        Ok(config)
    }

    /// Save the user configuration file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Write a settings file with every default spelled out, unless one
    /// already exists.
    ///
    /// # Returns
    /// Whether a file was written
    pub fn ensure_user_config(&self) -> Result<bool> {
        if self.user_config_path.exists() {
            return Ok(false);
        }
        self.save_user_config(&UserConfig::default())?;
        Ok(true)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }
}
