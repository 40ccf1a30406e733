use console::style;

use skiff_config::SkiffConfig;
use skiff_core::SkiffError;
use skiff_runtime::load_catalog;
use skiff_skills::{Skill, SkillSource, SkillSync, SyncAction};

use super::SkillAction;

pub(super) async fn cmd_skills(config: &SkiffConfig, action: SkillAction) -> skiff_core::Result<()> {
    match action {
        SkillAction::List { json } => {
            let catalog = load_catalog(config)?;
            if json {
                let skills: Vec<&Skill> = catalog.skills().iter().map(|s| s.as_ref()).collect();
                println!("{}", serde_json::to_string_pretty(&skills)?);
                return Ok(());
            }

            if catalog.is_empty() {
                println!("No skills found.");
                for dir in config.skills.resolved_dirs() {
                    println!("  searched {}", dir.display());
                }
                println!("  Add one as <dir>/<name>/SKILL.md, or configure [[skills.remotes]] and run `skiff skills sync`.");
                return Ok(());
            }

            println!("{}\n", style(format!("Available Skills ({}):", catalog.len())).bold());
            for skill in catalog.skills() {
                let origin = match skill.source {
                    SkillSource::Local => "",
                    SkillSource::Remote => " [remote]",
                };
                println!("  {}{}", style(&skill.name).cyan(), style(origin).dim());
                if skill.title != skill.name {
                    println!("    {}", skill.title);
                }
                println!("    {}", skill.description);
                if !skill.allowed_tools.is_empty() {
                    println!("    Tools: {}", skill.allowed_tools.join(", "));
                }
                println!("    File: {}", skill.file_path.display());
                println!();
            }
            Ok(())
        }
        SkillAction::Sync => {
            if config.skills.remotes.is_empty() {
                println!("No remote skill sources configured.");
                println!("  Add [[skills.remotes]] entries with name and url to skiff.toml.");
                return Ok(());
            }

            let sync = SkillSync::new(config.skills.resolved_cache_dir(), config.skills.remotes.clone());
            let outcomes = sync.sync_all().await;
            let mut failed = Vec::new();
            for outcome in &outcomes {
                match outcome.action {
                    SyncAction::Cloned | SyncAction::Updated => {
                        let verb = if outcome.action == SyncAction::Cloned {
                            "cloned"
                        } else {
                            "updated"
                        };
                        println!(
                            "  {} {} {} ({})",
                            style("ok").green(),
                            outcome.name,
                            verb,
                            outcome.path.display()
                        );
                    }
                    SyncAction::Failed => {
                        println!("  {} {}: {}", style("failed").red(), outcome.name, outcome.detail);
                        failed.push(outcome.name.as_str());
                    }
                }
            }

            if failed.is_empty() {
                Ok(())
            } else {
                Err(SkiffError::SkillSync {
                    remote: failed.join(", "),
                    reason: format!("{} of {} remotes failed", failed.len(), outcomes.len()),
                })
            }
        }
    }
}
