use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::SkiffConfig;

/// Loads the Skiff configuration from disk and the environment.
pub struct ConfigLoader {
    config: SkiffConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path:
    /// explicit path > SKIFF_CONFIG env > ./skiff.toml > ~/.skiff/skiff.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("SKIFF_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("skiff.toml");
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".skiff")
            .join("skiff.toml")
    }

    /// Load the config from disk, falling back to defaults, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> skiff_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw, &config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            SkiffConfig::default()
        };

        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::check(&config)?;

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse TOML text into a config. `origin` is only used in error messages.
    pub fn parse(raw: &str, origin: &Path) -> skiff_core::Result<SkiffConfig> {
        toml::from_str::<SkiffConfig>(raw).map_err(|e| {
            skiff_core::SkiffError::Config(format!("failed to parse {}: {}", origin.display(), e))
        })
    }

    /// Validate a config, logging warnings and failing on errors.
    pub fn check(config: &SkiffConfig) -> skiff_core::Result<()> {
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
                Ok(())
            }
            Err(e) => Err(skiff_core::SkiffError::Config(e)),
        }
    }

    /// Get a copy of the loaded config.
    pub fn get(&self) -> SkiffConfig {
        self.config.clone()
    }

    /// Path the config was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (SKIFF_MODEL, SKIFF_MAX_STEPS, etc.).
    ///
    /// `lookup` resolves a variable name to its value; production code passes
    /// `std::env::var`, tests pass a map.
    pub fn apply_env_overrides(
        mut config: SkiffConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SkiffConfig {
        if let Some(v) = lookup("SKIFF_MODEL") {
            config.agent.model = v;
        }
        if let Some(v) = lookup("SKIFF_MAX_STEPS") {
            match v.parse::<u32>() {
                Ok(steps) => config.agent.max_steps = steps,
                Err(_) => warn!(value = %v, "ignoring non-numeric SKIFF_MAX_STEPS"),
            }
        }
        if let Some(v) = lookup("SKIFF_WORKSPACE") {
            config.workspace.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("SKIFF_LOG_LEVEL") {
            config.logging.level = v;
        }
        // API key: env var fills in when config file doesn't have the key set.
        if config.services.api_key().is_none() {
            if let Some(v) = lookup("ANTHROPIC_API_KEY") {
                config.services.anthropic_api_key = Some(v);
            }
        }
        config
    }
}
