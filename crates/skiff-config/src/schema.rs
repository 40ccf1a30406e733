use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration, maps to `skiff.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkiffConfig {
    pub agent: AgentConfig,
    pub workspace: WorkspaceConfig,
    pub skills: SkillsConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model used for the agent loop, e.g. "claude-sonnet-4-20250514".
    pub model: String,
    /// Model used for skill routing. Empty = same as `model`.
    pub router_model: String,
    /// Maximum tokens per agent response.
    pub max_tokens: u32,
    /// Maximum tokens for the routing reply (it is a tiny JSON object).
    pub router_max_tokens: u32,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Step budget: the loop may call the model `max_steps + 1` times.
    pub max_steps: u32,
    /// When false, the loop is a single request/response with no tools advertised.
    pub tools_enabled: bool,
    /// Replaces the built-in base instructions when set.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            router_model: String::new(),
            max_tokens: 4096,
            router_max_tokens: 512,
            temperature: 0.2,
            max_steps: 8,
            tools_enabled: true,
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    /// The model to use for routing calls.
    pub fn router_model(&self) -> &str {
        if self.router_model.is_empty() {
            &self.model
        } else {
            &self.router_model
        }
    }
}

// ── Workspace ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory every file and shell tool is confined to.
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

// ── Skills ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Local skill directories, highest precedence first.
    pub dirs: Vec<PathBuf>,
    /// Where remote skill repositories are checked out.
    pub cache_dir: PathBuf,
    /// Git repositories to pull skills from.
    pub remotes: Vec<RemoteSkillSource>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dirs: vec![PathBuf::from("./skills"), PathBuf::from("~/.skiff/skills")],
            cache_dir: PathBuf::from("~/.skiff/remote-skills"),
            remotes: vec![],
        }
    }
}

impl SkillsConfig {
    /// Local skill directories with `~` expanded.
    pub fn resolved_dirs(&self) -> Vec<PathBuf> {
        self.dirs.iter().map(|d| expand_home(d)).collect()
    }

    /// Remote checkout directory with `~` expanded.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_home(&self.cache_dir)
    }
}

/// A git repository containing SKILL.md directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSkillSource {
    /// Checkout directory name under `cache_dir`.
    pub name: String,
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".into()
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Services ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Anthropic API key.
    /// Can also be set via ANTHROPIC_API_KEY environment variable.
    /// Config file takes priority over environment variable.
    pub anthropic_api_key: Option<String>,
    /// Base URL of the Messages API.
    pub anthropic_base_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
        }
    }
}

impl ServicesConfig {
    /// The API key, if one is set and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{} {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl SkiffConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Agent model ───
        if self.agent.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'claude-sonnet-4-20250514'".into()),
            });
        }

        // ── Temperature ───
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            warnings.push(ConfigWarning {
                field: "agent.temperature".into(),
                message: format!("temperature {} is out of range", self.agent.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 2.0".into()),
            });
        }

        // ── Max tokens ───
        if self.agent.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_tokens".into(),
                message: "max_tokens is 0, the agent won't produce output".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 4096".into()),
            });
        }
        if self.agent.router_max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "agent.router_max_tokens".into(),
                message: "router_max_tokens is 0, routing will always fall back".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set to e.g. 512".into()),
            });
        }

        // ── Step budget ───
        if self.agent.max_steps > 100 {
            warnings.push(ConfigWarning {
                field: "agent.max_steps".into(),
                message: format!("max_steps {} is very high", self.agent.max_steps),
                severity: WarningSeverity::Warning,
                hint: Some("Each step is a full model call; 8-20 is typical".into()),
            });
        }

        // ── Remotes ───
        for (i, remote) in self.skills.remotes.iter().enumerate() {
            if remote.url.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("skills.remotes[{i}].url"),
                    message: format!("remote '{}' has no url", remote.name),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
            if remote.name.trim().is_empty() || remote.name.contains(['/', '\\']) {
                warnings.push(ConfigWarning {
                    field: format!("skills.remotes[{i}].name"),
                    message: format!("invalid remote name '{}'", remote.name),
                    severity: WarningSeverity::Error,
                    hint: Some("Use a plain directory name like 'team-skills'".into()),
                });
            }
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Error,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // ── Credentials ───
        if self.services.api_key().is_none() {
            warnings.push(ConfigWarning {
                field: "services.anthropic_api_key".into(),
                message: "no API key, skill routing falls back to the heuristic ranker".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set ANTHROPIC_API_KEY or [services] anthropic_api_key".into()),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
