//! Checkpoint sinks: durable "step completed" markers.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::git::Git;

/// Records that a step completed. Called once per applied step, after its files
/// are written and its commands succeeded.
pub trait CheckpointSink {
    fn commit(&self, message: &str) -> Result<()>;
}

/// One git commit per step, staging every working-tree change.
#[derive(Debug, Clone)]
pub struct GitCheckpoint {
    git: Git,
    message_prefix: Option<String>,
}

impl GitCheckpoint {
    pub fn new(workdir: impl Into<PathBuf>, message_prefix: Option<String>) -> Self {
        Self {
            git: Git::new(workdir),
            message_prefix,
        }
    }

    /// Check the target can take checkpoints before any step runs.
    ///
    /// With `require_clean`, uncommitted changes outside `ignored_prefix` are
    /// refused, since `git add -A` would fold them into the first step's commit.
    pub fn ensure_ready(&self, require_clean: bool, ignored_prefix: &str) -> Result<()> {
        if !self.git.is_work_tree()? {
            return Err(anyhow!(
                "{} is not a git work tree (run `git init` or pass --no-checkpoint)",
                self.git.workdir().display()
            ));
        }
        if require_clean {
            self.git.ensure_clean_except_prefixes(&[ignored_prefix])?;
        }
        Ok(())
    }

    fn message(&self, step: &str) -> String {
        match &self.message_prefix {
            Some(prefix) => format!("{prefix}{step}"),
            None => step.to_string(),
        }
    }
}

impl CheckpointSink for GitCheckpoint {
    #[instrument(skip_all, fields(step = message))]
    fn commit(&self, message: &str) -> Result<()> {
        self.git.add_all()?;
        // Steps that changed nothing still get a commit so the history stays one-per-step.
        self.git.commit_staged(&self.message(message), true)?;
        let sha = self.git.head_short_sha(12)?;
        info!(%sha, "checkpoint committed");
        Ok(())
    }
}

/// Sink for runs without version control: logs and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoint;

impl CheckpointSink for NoCheckpoint {
    fn commit(&self, message: &str) -> Result<()> {
        debug!(step = message, "checkpoint disabled");
        Ok(())
    }
}
