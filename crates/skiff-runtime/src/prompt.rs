use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use skiff_skills::Skill;

const BASE_INSTRUCTIONS_TEMPLATE: &str = r#"You are Skiff, a task agent working inside a sandboxed workspace.

## Environment
- **Workspace root:** {workspace}
- **OS:** {os}

## Principles

- **Act with tools.** Inspect the workspace (list_dir, glob, read_file) before changing it. Don't guess paths.
- **Stay inside the workspace.** Every path is relative to the workspace root; paths outside it are refused.
- **Keep shell commands non-interactive.** Stdin is closed and long commands are killed at their timeout.
- **Diagnose and retry on errors.** Tool errors come back as results. Read them, fix the cause, try again.
- **Finish with a direct answer.** When the task is done, reply with the result and stop calling tools."#;

/// Base instructions for a workspace, unless `override_text` replaces them.
pub fn base_instructions(workspace_root: &Path, override_text: Option<&str>) -> String {
    match override_text.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => text.to_string(),
        None => BASE_INSTRUCTIONS_TEMPLATE
            .replace("{workspace}", &workspace_root.display().to_string())
            .replace("{os}", std::env::consts::OS),
    }
}

/// Append one delimited block per selected skill. Only selected skills'
/// bodies ever reach the model.
pub fn build_system_prompt(base: &str, skills: &[Arc<Skill>]) -> String {
    let mut prompt = base.to_string();
    if skills.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\n## Active skills\n\nFollow these instructions where they apply to the request.\n");
    for skill in skills {
        let _ = write!(
            prompt,
            "\n<skill name=\"{}\">\n<title>{}</title>\n<description>{}</description>\n<instructions>\n{}\n</instructions>\n</skill>\n",
            skill.name,
            skill.title,
            skill.description,
            skill.body.trim(),
        );
    }
    prompt
}
