//! Run state: which steps of which pipeline have been checkpointed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted resume marker (`.scaffold/run_state.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunState {
    /// Pipeline the completed steps belong to.
    pub pipeline: String,
    /// Target directory the steps were applied to.
    pub working_directory: PathBuf,
    /// Step names in completion order. Appended only after a step's checkpoint succeeds.
    pub completed_steps: Vec<String>,
}

impl RunState {
    pub fn new(pipeline: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: pipeline.into(),
            working_directory: working_directory.into(),
            completed_steps: Vec::new(),
        }
    }

    pub fn is_completed(&self, step: &str) -> bool {
        self.completed_steps.iter().any(|name| name == step)
    }

    /// Record a completed step; a name is never recorded twice.
    pub fn mark_completed(&mut self, step: &str) {
        if !self.is_completed(step) {
            self.completed_steps.push(step.to_string());
        }
    }
}

/// Load run state from disk.
pub fn load_run_state(path: &Path) -> Result<RunState> {
    debug!(path = %path.display(), "loading run state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run state {}", path.display()))?;
    let state: RunState = serde_json::from_str(&contents)
        .with_context(|| format!("parse run state {}", path.display()))?;
    debug!(
        pipeline = %state.pipeline,
        completed = state.completed_steps.len(),
        "run state loaded"
    );
    Ok(state)
}

/// Load the run state for `pipeline`, or start a fresh one when none exists.
///
/// Refuses a state recorded for another pipeline: resuming it would skip steps
/// by name that this pipeline never applied.
pub fn load_or_new_run_state(path: &Path, pipeline: &str, workdir: &Path) -> Result<RunState> {
    if !path.exists() {
        return Ok(RunState::new(pipeline, workdir));
    }
    let state = load_run_state(path)?;
    if state.pipeline != pipeline {
        return Err(anyhow!(
            "run state {} belongs to pipeline '{}', not '{}'",
            path.display(),
            state.pipeline,
            pipeline
        ));
    }
    Ok(state)
}

/// Atomically write run state to disk (temp file + rename).
pub fn write_run_state(path: &Path, state: &RunState) -> Result<()> {
    debug!(
        path = %path.display(),
        completed = state.completed_steps.len(),
        "writing run state"
    );
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("run state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp run state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace run state {}", path.display()))?;
    Ok(())
}
