use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skiff_config::{ConfigLoader, SkiffConfig};
use skiff_core::SkiffError;

mod run;
mod select;
mod skills;

/// Skiff: a skill-routed, tool-using agent
#[derive(Parser)]
#[command(name = "skiff", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to skiff.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Workspace root the tools are confined to
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select skills for a prompt and run the agent on it
    Run {
        /// The task for the agent
        prompt: String,
        /// Maximum tool steps before the run is cut off
        #[arg(long)]
        max_steps: Option<u32>,
        /// Answer in a single exchange without tools
        #[arg(long)]
        no_tools: bool,
        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how skills would be selected for a prompt, without running
    Select {
        /// The prompt to rank skills against
        prompt: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the skill catalog
    Skills {
        #[command(subcommand)]
        action: SkillAction,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SkillAction {
    /// List local skills and skills from synced remotes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clone or update every configured remote skill repository
    Sync,
}

impl Cli {
    pub async fn run(self) -> skiff_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let mut config = config_loader.get();
        self.apply_overrides(&mut config);

        init_tracing(&config);

        match self.command {
            Commands::Run {
                prompt,
                max_steps,
                no_tools,
                json,
            } => {
                if let Some(steps) = max_steps {
                    config.agent.max_steps = steps;
                }
                if no_tools {
                    config.agent.tools_enabled = false;
                }
                run::cmd_run(&config, &prompt, json).await
            }
            Commands::Select { prompt, json } => select::cmd_select(&config, &prompt, json).await,
            Commands::Skills { action } => skills::cmd_skills(&config, action).await,
            Commands::Config { json } => cmd_config(&config, json),
        }
    }

    /// Fold the global flags into the loaded config.
    ///
    /// Log level: --verbose > --quiet > --log-level > config.
    fn apply_overrides(&self, config: &mut SkiffConfig) {
        if self.verbose {
            config.logging.level = "debug".into();
        } else if self.quiet {
            config.logging.level = "error".into();
        } else if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(root) = &self.workspace {
            config.workspace.root = root.clone();
        }
    }
}

/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(config: &SkiffConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn cmd_config(config: &SkiffConfig, json: bool) -> skiff_core::Result<()> {
    let config = redacted(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!(
            "{}",
            toml::to_string_pretty(&config).map_err(|e| SkiffError::Config(e.to_string()))?
        );
    }
    Ok(())
}

/// A copy of the config that is safe to print.
fn redacted(config: &SkiffConfig) -> SkiffConfig {
    let mut config = config.clone();
    if config.services.api_key().is_some() {
        config.services.anthropic_api_key = Some("***".into());
    }
    config
}
