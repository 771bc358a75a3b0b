use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// TOML-backed configuration loaded from disk.
/// Secrets (API keys, tokens) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub identity: IdentityConfig,
    pub feed: FeedConfig,
    pub cycle: CycleConfig,
    pub models: ModelsConfig,
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Handle of the account we post as, recorded on every PostResult.
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub list_id: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    pub length_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub generation: String,
    /// Falls back to `generation` when unset.
    pub vision: Option<String>,
    pub research: String,
}

impl ModelsConfig {
    pub fn vision_model(&self) -> &str {
        self.vision.as_deref().unwrap_or(&self.generation)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptsConfig {
    /// Persona/system prompt file, relative to the config file.
    pub persona: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub generation_attempts: u32,
    pub publish_attempts: u32,
    pub publish_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            generation_attempts: 3,
            publish_attempts: 4,
            publish_delay_secs: 15,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.identity.handle.trim().is_empty() {
            bail!("identity.handle must not be empty");
        }
        if self.feed.list_id.trim().is_empty() {
            bail!("feed.list_id must not be empty");
        }
        if !(1..=100).contains(&self.feed.max_results) {
            bail!(
                "feed.max_results must be between 1 and 100, got {}",
                self.feed.max_results
            );
        }
        if self.cycle.length_secs == 0 {
            bail!("cycle.length_secs must be positive");
        }
        if self.retry.generation_attempts == 0 || self.retry.publish_attempts == 0 {
            bail!("retry attempt budgets must be at least 1");
        }
        Ok(())
    }

    /// Read the persona prompt, resolving its path against `config_dir`.
    pub fn load_persona(&self, config_dir: &Path) -> Result<String> {
        let path = config_dir.join(&self.prompts.persona);
        let persona = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read persona prompt: {}", path.display()))?;
        let persona = persona.trim().to_string();
        if persona.is_empty() {
            bail!("Persona prompt is empty: {}", path.display());
        }
        Ok(persona)
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [identity]
        handle = "ai_meme_review"

        [feed]
        list_id = "1867000000000000000"
        max_results = 5

        [cycle]
        length_secs = 3600

        [models]
        generation = "gpt-4o"
        research = "sonar-pro"

        [prompts]
        persona = "prompts/persona.md"
    "#;

    #[test]
    fn retry_section_is_optional() {
        let config: FileConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.retry.generation_attempts, 3);
        assert_eq!(config.retry.publish_attempts, 4);
        assert_eq!(config.retry.publish_delay_secs, 15);
        assert_eq!(config.models.vision_model(), "gpt-4o");
        config.validate().unwrap();
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let text = format!("{MINIMAL}\n[moderation]\nenabled = true\n");
        assert!(toml::from_str::<FileConfig>(&text).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_batch() {
        let mut config: FileConfig = toml::from_str(MINIMAL).unwrap();
        config.feed.max_results = 0;
        assert!(config.validate().is_err());
        config.feed.max_results = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_cycle() {
        let mut config: FileConfig = toml::from_str(MINIMAL).unwrap();
        config.cycle.length_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn persona_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/persona.md"), "  You are a dog.\n").unwrap();

        let config: FileConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.load_persona(dir.path()).unwrap(), "You are a dog.");
    }
}
