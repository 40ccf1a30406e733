use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use skiff_config::{AgentConfig, SkiffConfig, expand_home};
use skiff_core::{Conversation, Result, SkiffError};
use skiff_llm::{AnthropicProvider, LlmProvider};
use skiff_skills::{Catalog, Selection, SkillRouter, SkillSync, remote_skill_dirs, select};

use crate::agent_loop::{AgentLoop, AgentRunResult, LoopConfig};
use crate::prompt::{base_instructions, build_system_prompt};
use crate::sandbox::Workspace;
use crate::tools::ToolRuntime;

/// Outcome of [`Agent::run`]: which skills were used and what the loop produced.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub selection: Selection,
    pub result: AgentRunResult,
}

/// Serializable summary of a run, for `--json` output.
#[derive(Debug, Serialize)]
pub struct AgentRunSummary<'a> {
    pub skills: Vec<&'a str>,
    pub method: skiff_skills::SelectionMethod,
    pub result: &'a AgentRunResult,
}

impl AgentRun {
    pub fn summary(&self) -> AgentRunSummary<'_> {
        AgentRunSummary {
            skills: self.selection.names(),
            method: self.selection.method,
            result: &self.result,
        }
    }
}

/// Wires skill selection, tool restriction, prompt building and the loop.
pub struct Agent {
    config: AgentConfig,
    workspace: Workspace,
    catalog: Catalog,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Agent {
    /// An agent without a backend: selection works heuristically, `run` fails.
    pub fn new(config: AgentConfig, workspace: Workspace, catalog: Catalog) -> Self {
        Self {
            config,
            workspace,
            catalog,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build everything from configuration: workspace, catalog and, when an
    /// API key is configured, the Anthropic backend.
    pub fn from_config(config: &SkiffConfig) -> Result<Self> {
        let workspace = Workspace::new(expand_home(&config.workspace.root))?;
        let catalog = load_catalog(config)?;
        let agent = Self::new(config.agent.clone(), workspace, catalog);

        Ok(match config.services.api_key() {
            Some(key) => {
                let provider = AnthropicProvider::new(key.to_string())
                    .with_base_url(config.services.anthropic_base_url.clone());
                agent.with_provider(Arc::new(provider))
            }
            None => {
                info!("no API key configured, skill selection will be heuristic only");
                agent
            }
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Pick skills for a prompt. Routing is used only when a backend exists.
    pub async fn select(&self, prompt: &str) -> Selection {
        let router = self.provider.as_ref().map(|p| {
            SkillRouter::new(
                Arc::clone(p),
                self.config.router_model(),
                self.config.router_max_tokens,
            )
        });
        select(prompt, &self.catalog, router.as_ref()).await
    }

    /// Select skills, then run the tool loop with them in the system prompt.
    pub async fn run(&self, prompt: &str) -> Result<AgentRun> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            SkiffError::Agent(
                "no API key configured; set ANTHROPIC_API_KEY or [services] anthropic_api_key".into(),
            )
        })?;
        provider.health_check().await?;

        let selection = self.select(prompt).await;
        info!(
            skills = ?selection.names(),
            method = %selection.method,
            "skill selection complete"
        );

        let mut runtime = ToolRuntime::new(self.workspace.clone());
        let allowed: BTreeSet<&str> = selection
            .skills
            .iter()
            .flat_map(|s| s.allowed_tools.iter().map(String::as_str))
            .collect();
        if !allowed.is_empty() {
            runtime.restrict_tools(&allowed.into_iter().collect::<Vec<_>>());
        }

        let base = base_instructions(self.workspace.root(), self.config.system_prompt.as_deref());
        let system = build_system_prompt(&base, &selection.skills);
        debug!(chars = system.len(), "system prompt built");

        let loop_config = LoopConfig {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            max_steps: self.config.max_steps,
            tools_enabled: self.config.tools_enabled,
        };
        let mut conversation = Conversation::from_prompt(prompt);
        let result = AgentLoop::new(provider.as_ref(), &runtime, loop_config)
            .run(&system, &mut conversation)
            .await?;

        Ok(AgentRun { selection, result })
    }
}

/// Discover local skill directories and existing remote checkouts.
pub fn load_catalog(config: &SkiffConfig) -> Result<Catalog> {
    let sync = SkillSync::new(
        config.skills.resolved_cache_dir(),
        config.skills.remotes.clone(),
    );
    let remote_dirs: Vec<_> = sync
        .existing_checkouts()
        .iter()
        .flat_map(|checkout| remote_skill_dirs(checkout))
        .collect();
    Catalog::load(&config.skills.resolved_dirs(), &remote_dirs)
}
