//! Remote skill synchronization.
//!
//! Each configured remote is a git repository checked out under the cache
//! directory. Sync shallow-clones missing checkouts and fast-forwards existing
//! ones. A failing remote is reported and never stops the others.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use skiff_config::RemoteSkillSource;
use skiff_core::SkiffError;

const GIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Cloned,
    Updated,
    Failed,
}

/// Result of syncing one remote.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub name: String,
    pub path: PathBuf,
    pub action: SyncAction,
    /// git output on success, the error on failure.
    pub detail: String,
}

pub struct SkillSync {
    cache_dir: PathBuf,
    remotes: Vec<RemoteSkillSource>,
}

impl SkillSync {
    pub fn new(cache_dir: PathBuf, remotes: Vec<RemoteSkillSource>) -> Self {
        Self { cache_dir, remotes }
    }

    /// Where the given remote is checked out.
    pub fn checkout_path(&self, remote: &RemoteSkillSource) -> PathBuf {
        self.cache_dir.join(&remote.name)
    }

    /// Checkout directories that exist on disk, in configuration order.
    pub fn existing_checkouts(&self) -> Vec<PathBuf> {
        self.remotes
            .iter()
            .map(|r| self.checkout_path(r))
            .filter(|p| p.join(".git").exists())
            .collect()
    }

    /// Clone or update every remote, sequentially.
    pub async fn sync_all(&self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::with_capacity(self.remotes.len());
        for remote in &self.remotes {
            outcomes.push(self.sync_one(remote).await);
        }
        outcomes
    }

    async fn sync_one(&self, remote: &RemoteSkillSource) -> SyncOutcome {
        let path = self.checkout_path(remote);
        let updating = path.join(".git").exists();

        let result = if updating {
            let dir = path.to_string_lossy();
            run_git(&["-C", &dir, "pull", "--ff-only"]).await
        } else {
            match std::fs::create_dir_all(&self.cache_dir) {
                Ok(()) => {
                    let dest = path.to_string_lossy();
                    run_git(&[
                        "clone",
                        "--depth",
                        "1",
                        "--branch",
                        &remote.branch,
                        &remote.url,
                        &dest,
                    ])
                    .await
                }
                Err(e) => Err(SkiffError::Io(e)),
            }
        };

        match result {
            Ok(output) => {
                let action = if updating {
                    SyncAction::Updated
                } else {
                    SyncAction::Cloned
                };
                info!(remote = %remote.name, ?action, path = ?path, "skill remote synced");
                SyncOutcome {
                    name: remote.name.clone(),
                    path,
                    action,
                    detail: output.trim().to_string(),
                }
            }
            Err(e) => {
                let err = SkiffError::SkillSync {
                    remote: remote.name.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "skill remote sync failed");
                SyncOutcome {
                    name: remote.name.clone(),
                    path,
                    action: SyncAction::Failed,
                    detail: err.to_string(),
                }
            }
        }
    }
}

/// Run git non-interactively and return its combined output.
async fn run_git(args: &[&str]) -> skiff_core::Result<String> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(GIT_TIMEOUT, cmd.output())
        .await
        .map_err(|_| SkiffError::Skill(format!("git timed out after {}s", GIT_TIMEOUT.as_secs())))?
        .map_err(|e| SkiffError::Skill(format!("failed to run git: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        Ok(format!("{stdout}{stderr}"))
    } else {
        let code = output.status.code().unwrap_or(-1);
        Err(SkiffError::Skill(format!("git exited with {code}: {}", stderr.trim())))
    }
}
