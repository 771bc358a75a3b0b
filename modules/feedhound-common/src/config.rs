use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::file_config::{load_config, FileConfig};

const DEFAULT_CONFIG_PATH: &str = "config/feedhound.toml";

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; identity, feed, models,
/// and prompts live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Generative and research oracles
    pub openai_api_key: String,
    pub perplexity_api_key: String,

    // Platform
    pub x_bearer_token: String,
    pub x_user_access_token: String,

    pub config_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            openai_api_key: required_env("OPENAI_API_KEY")?,
            perplexity_api_key: required_env("PERPLEXITY_API_KEY")?,
            x_bearer_token: required_env("X_BEARER_TOKEN")?,
            x_user_access_token: required_env("X_USER_ACCESS_TOKEN")?,
            config_path: std::env::var("FEEDHOUND_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  PERPLEXITY_API_KEY: {}", preview(&self.perplexity_api_key));
        tracing::info!("  X_BEARER_TOKEN: {}", preview(&self.x_bearer_token));
        tracing::info!("  X_USER_ACCESS_TOKEN: {}", preview(&self.x_user_access_token));
        tracing::info!("  FEEDHOUND_CONFIG: {}", self.config_path.display());
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} environment variable is required"))
}

/// Everything the agent needs at startup: secrets, file config, persona text.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub file: FileConfig,
    pub persona: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let app = AppConfig::from_env()?;
        let mut file = load_config(&app.config_path)?;
        apply_env_overrides(&mut file, |key| std::env::var(key).ok())?;
        file.validate()?;

        let config_dir = app.config_path.parent().unwrap_or_else(|| Path::new("."));
        let persona = file.load_persona(config_dir)?;

        tracing::info!(
            handle = %file.identity.handle,
            list_id = %file.feed.list_id,
            max_results = file.feed.max_results,
            cycle_secs = file.cycle.length_secs,
            generation_model = %file.models.generation,
            research_model = %file.models.research,
            "Settings loaded"
        );

        Ok(Self { app, file, persona })
    }
}

/// `X_LIST_ID`, `MAX_RESULTS` and `CYCLE_LENGTH` take precedence over the file.
pub fn apply_env_overrides(
    file: &mut FileConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(list_id) = lookup("X_LIST_ID") {
        file.feed.list_id = list_id;
    }
    if let Some(max_results) = lookup("MAX_RESULTS") {
        file.feed.max_results = max_results
            .trim()
            .parse()
            .with_context(|| format!("MAX_RESULTS must be a number, got {max_results:?}"))?;
    }
    if let Some(length) = lookup("CYCLE_LENGTH") {
        file.cycle.length_secs = length
            .trim()
            .parse()
            .with_context(|| format!("CYCLE_LENGTH must be a number of seconds, got {length:?}"))?;
    }
    Ok(())
}
