use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use skiff_core::{Result, SkiffError, Tool, ToolCall, ToolExecutor, ToolResult};

use crate::sandbox::Workspace;

/// `read_file` output is cut after this many characters.
pub const READ_LIMIT_CHARS: usize = 200_000;
/// Each shell stream is cut after this many characters.
pub const SHELL_STREAM_LIMIT_CHARS: usize = 50_000;
pub const SHELL_TIMEOUT_DEFAULT_MS: u64 = 30_000;
pub const SHELL_TIMEOUT_MIN_MS: u64 = 1_000;
pub const SHELL_TIMEOUT_MAX_MS: u64 = 120_000;
const GLOB_MAX_RESULTS: usize = 1_000;

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIR: &str = "list_dir";
pub const GLOB: &str = "glob";
pub const RUN_SHELL: &str = "run_shell";

const ALL_TOOLS: [&str; 5] = [READ_FILE, WRITE_FILE, LIST_DIR, GLOB, RUN_SHELL];

/// Map a tool name from any common naming convention to one of ours.
///
/// Matching is case-insensitive and treats `-` like `_`.
pub fn resolve_tool_name(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase().replace('-', "_");
    let resolved = match key.as_str() {
        "read_file" | "read" | "view" | "cat" | "file_read" => READ_FILE,
        "write_file" | "write" | "edit" | "multiedit" | "create" | "file_write" | "file_edit" => WRITE_FILE,
        "list_dir" | "ls" | "list" | "listdir" | "file_list" => LIST_DIR,
        "glob" | "search" | "find" | "file_find" => GLOB,
        "run_shell" | "bash" | "shell" | "terminal" | "sh" | "exec" | "grep" | "shell_exec" => RUN_SHELL,
        _ => return None,
    };
    Some(resolved)
}

/// The sandboxed operations exposed to the model.
///
/// Every path argument goes through [`Workspace::resolve`]. Failures are
/// returned as `Err` and turned into error results by the agent loop; a
/// shell command that runs but exits non-zero is an `Ok` error result.
#[derive(Debug, Clone)]
pub struct ToolRuntime {
    workspace: Workspace,
    /// `None` = the full registry is advertised.
    allowed: Option<BTreeSet<&'static str>>,
}

impl ToolRuntime {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            allowed: None,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Narrow the advertised tools to `names`, resolved through the alias
    /// table. Unknown names are ignored. If nothing resolves, the full
    /// registry stays exposed.
    pub fn restrict_tools<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut resolved = BTreeSet::new();
        for name in names {
            match resolve_tool_name(name.as_ref()) {
                Some(tool) => {
                    resolved.insert(tool);
                }
                None => debug!(tool = name.as_ref(), "unknown tool name in allow-list"),
            }
        }

        if resolved.is_empty() {
            if !names.is_empty() {
                warn!("allow-list matched no known tools, exposing all tools");
            }
            self.allowed = None;
        } else {
            info!(tools = ?resolved, "restricting tools");
            self.allowed = Some(resolved);
        }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        ALL_TOOLS.contains(&name) && self.allowed.as_ref().is_none_or(|a| a.contains(name))
    }

    fn definitions() -> Vec<Tool> {
        vec![
            Tool {
                name: READ_FILE.into(),
                description: format!(
                    "Read a UTF-8 text file from the workspace. Output is truncated after {READ_LIMIT_CHARS} characters."
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path, relative to the workspace root"
                        }
                    },
                    "required": ["path"]
                }),
            },
            Tool {
                name: WRITE_FILE.into(),
                description: "Write a text file in the workspace, creating parent directories. Replaces the whole file.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "File path, relative to the workspace root"
                        },
                        "content": {
                            "type": "string",
                            "description": "Complete file content"
                        },
                        "overwrite": {
                            "type": "boolean",
                            "description": "Replace an existing file (default: true). When false, fails if the file exists."
                        }
                    },
                    "required": ["path", "content"]
                }),
            },
            Tool {
                name: LIST_DIR.into(),
                description: "List a directory in the workspace. Directories end with '/'.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Directory path, relative to the workspace root (default: '.')"
                        }
                    }
                }),
            },
            Tool {
                name: GLOB.into(),
                description: "Find files matching a glob pattern such as '**/*.md'. Returns paths relative to cwd.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "pattern": {
                            "type": "string",
                            "description": "Glob pattern; '**' crosses directories"
                        },
                        "cwd": {
                            "type": "string",
                            "description": "Directory to search from (default: workspace root)"
                        },
                        "ignore": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Glob patterns to exclude"
                        }
                    },
                    "required": ["pattern"]
                }),
            },
            Tool {
                name: RUN_SHELL.into(),
                description: format!(
                    "Run a non-interactive shell command in the workspace and return labeled stdout/stderr. \
                     Stdin is /dev/null. Timeout defaults to {SHELL_TIMEOUT_DEFAULT_MS}ms \
                     (allowed {SHELL_TIMEOUT_MIN_MS}-{SHELL_TIMEOUT_MAX_MS}ms); the command is killed when it expires."
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "Command passed to `sh -c`"
                        },
                        "cwd": {
                            "type": "string",
                            "description": "Working directory, relative to the workspace root"
                        },
                        "timeout_ms": {
                            "type": "integer",
                            "description": "Timeout in milliseconds"
                        }
                    },
                    "required": ["command"]
                }),
            },
        ]
    }

    async fn exec_read_file(&self, call: &ToolCall) -> Result<ToolResult> {
        let input = required_str(call, "path")?;
        let path = self.workspace.resolve(input)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SkiffError::tool(READ_FILE, format!("{input}: {e}")))?;

        let total = content.chars().count();
        let content = if total > READ_LIMIT_CHARS {
            let mut truncated: String = content.chars().take(READ_LIMIT_CHARS).collect();
            truncated.push_str(&format!(
                "\n\n[truncated: showing {READ_LIMIT_CHARS} of {total} characters]"
            ));
            truncated
        } else {
            content
        };

        Ok(ToolResult::ok(&call.id, content))
    }

    async fn exec_write_file(&self, call: &ToolCall) -> Result<ToolResult> {
        let input = required_str(call, "path")?;
        let content = required_str(call, "content")?;
        let overwrite = call.arguments["overwrite"].as_bool().unwrap_or(true);
        let path = self.workspace.resolve(input)?;

        if !overwrite && tokio::fs::try_exists(&path).await? {
            return Err(SkiffError::FileExists {
                path: input.into(),
            });
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| SkiffError::tool(WRITE_FILE, format!("{input}: {e}")))?;

        Ok(ToolResult::ok(
            &call.id,
            format!("Wrote {} bytes to {input}", content.len()),
        ))
    }

    async fn exec_list_dir(&self, call: &ToolCall) -> Result<ToolResult> {
        let input = call.arguments["path"].as_str().unwrap_or(".");
        let path = self.workspace.resolve(input)?;

        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| SkiffError::tool(LIST_DIR, format!("{input}: {e}")))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().to_string();
            // metadata() follows symlinks, so a link to a directory lists as one
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        let content = if entries.is_empty() {
            "(empty directory)".to_string()
        } else {
            entries.join("\n")
        };
        Ok(ToolResult::ok(&call.id, content))
    }

    async fn exec_glob(&self, call: &ToolCall) -> Result<ToolResult> {
        let pattern = required_str(call, "pattern")?;
        let base = self
            .workspace
            .resolve(call.arguments["cwd"].as_str().unwrap_or("."))?;

        let matcher = build_matcher(pattern)?;
        let ignore: Vec<globset::GlobMatcher> = string_list(&call.arguments["ignore"])
            .iter()
            .map(|p| build_matcher(p))
            .collect::<Result<_>>()?;

        let files = tokio::task::spawn_blocking(move || collect_files(&base, &matcher, &ignore))
            .await
            .map_err(|e| SkiffError::tool(GLOB, e.to_string()))?;

        let content = if files.is_empty() {
            format!("No files matched '{pattern}'")
        } else {
            files.join("\n")
        };
        Ok(ToolResult::ok(&call.id, content))
    }

    async fn exec_run_shell(&self, call: &ToolCall) -> Result<ToolResult> {
        let command = required_str(call, "command")?;
        let cwd = self
            .workspace
            .resolve(call.arguments["cwd"].as_str().unwrap_or("."))?;
        let timeout_ms = clamp_timeout(call.arguments["timeout_ms"].as_u64());

        info!(command, timeout_ms, "executing shell command");

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| SkiffError::tool(RUN_SHELL, format!("failed to spawn shell: {e}")))?;
        let pid = child.id();

        let output = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result.map_err(|e| SkiffError::tool(RUN_SHELL, e.to_string()))?,
            Err(_) => {
                // Dropping the future already killed `sh`; take its children too.
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                warn!(command, timeout_ms, "shell command timed out");
                return Err(SkiffError::ShellTimeout { timeout_ms });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let content = format!(
            "Exit code: {}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            exit_code,
            cap_chars(&String::from_utf8_lossy(&output.stdout), SHELL_STREAM_LIMIT_CHARS),
            cap_chars(&String::from_utf8_lossy(&output.stderr), SHELL_STREAM_LIMIT_CHARS),
        );

        Ok(ToolResult {
            tool_call_id: call.id.clone(),
            content,
            is_error: !output.status.success(),
        })
    }
}

#[async_trait]
impl ToolExecutor for ToolRuntime {
    fn tools(&self) -> Vec<Tool> {
        Self::definitions()
            .into_iter()
            .filter(|t| self.is_allowed(&t.name))
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        if !self.is_allowed(&call.tool_name) {
            return Err(SkiffError::ToolNotFound(call.tool_name.clone()));
        }
        debug!(tool = %call.tool_name, id = %call.id, "executing tool");

        match call.tool_name.as_str() {
            READ_FILE => self.exec_read_file(call).await,
            WRITE_FILE => self.exec_write_file(call).await,
            LIST_DIR => self.exec_list_dir(call).await,
            GLOB => self.exec_glob(call).await,
            RUN_SHELL => self.exec_run_shell(call).await,
            _ => Err(SkiffError::ToolNotFound(call.tool_name.clone())),
        }
    }
}

fn required_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str> {
    call.arguments[key]
        .as_str()
        .ok_or_else(|| SkiffError::tool(call.tool_name.clone(), format!("missing '{key}' argument")))
}

/// Accept either a JSON array of strings or a single string.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => vec![],
    }
}

fn clamp_timeout(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(SHELL_TIMEOUT_DEFAULT_MS)
        .clamp(SHELL_TIMEOUT_MIN_MS, SHELL_TIMEOUT_MAX_MS)
}

fn cap_chars(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let mut capped: String = text.chars().take(limit).collect();
    capped.push_str(&format!("\n[truncated: {} more characters]", total - limit));
    capped
}

fn build_matcher(pattern: &str) -> Result<globset::GlobMatcher> {
    globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| SkiffError::tool(GLOB, format!("invalid glob pattern '{pattern}': {e}")))
}

/// Walk `base` and collect files whose relative path matches. `.git` is skipped.
fn collect_files(
    base: &Path,
    matcher: &globset::GlobMatcher,
    ignore: &[globset::GlobMatcher],
) -> Vec<String> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(base)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == ".git"));

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(base).unwrap_or(entry.path());
        if !matcher.is_match(rel) || ignore.iter().any(|m| m.is_match(rel)) {
            continue;
        }
        files.push(rel.to_string_lossy().into_owned());
        if files.len() >= GLOB_MAX_RESULTS {
            break;
        }
    }
    files
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // SAFETY: the child was started with process_group(0), so -pid names its group.
    unsafe {
        libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
