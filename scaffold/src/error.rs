//! Typed failures surfaced by the pipeline runner.
//!
//! Every kind that happens while running names the offending step so the CLI
//! can report it. Infrastructure helpers return `anyhow::Error`; the runner
//! wraps those into [`ScaffoldError::Io`] or [`ScaffoldError::CheckpointFailed`].

use std::path::PathBuf;

use thiserror::Error;

use crate::core::mutator::MutationError;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("step {step:?}: anchor {anchor} not found in {}", file.display())]
    AnchorNotFound {
        step: String,
        file: PathBuf,
        anchor: String,
    },

    #[error("step {step:?}: {} already exists with different content", path.display())]
    WriteConflict { step: String, path: PathBuf },

    #[error("step {step:?}: command `{command}` {}{}", describe_exit(*code), stderr_suffix(stderr))]
    ExternalCommandFailed {
        step: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("step {step:?}: checkpoint failed: {source:#}")]
    CheckpointFailed {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed pipeline definition:\n- {}", reasons.join("\n- "))]
    MalformedStepDefinition { reasons: Vec<String> },

    #[error("step {step:?}: {}: {source}", file.display())]
    Mutation {
        step: String,
        file: PathBuf,
        #[source]
        source: MutationError,
    },

    #[error("step {step:?}: {source:#}")]
    Io {
        step: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ScaffoldError {
    /// Map a mutator failure onto the step-level error kinds.
    pub fn from_mutation(step: &str, file: PathBuf, err: MutationError) -> Self {
        let step = step.to_string();
        match err {
            MutationError::AnchorNotFound { anchor } => {
                ScaffoldError::AnchorNotFound { step, file, anchor }
            }
            MutationError::WriteConflict => ScaffoldError::WriteConflict { step, path: file },
            other => ScaffoldError::Mutation {
                step,
                file,
                source: other,
            },
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        ScaffoldError::MalformedStepDefinition {
            reasons: vec![reason.into()],
        }
    }

    /// Name of the step that failed, if the failure happened while running one.
    pub fn step(&self) -> Option<&str> {
        match self {
            ScaffoldError::AnchorNotFound { step, .. }
            | ScaffoldError::WriteConflict { step, .. }
            | ScaffoldError::ExternalCommandFailed { step, .. }
            | ScaffoldError::CheckpointFailed { step, .. }
            | ScaffoldError::Mutation { step, .. }
            | ScaffoldError::Io { step, .. } => Some(step),
            ScaffoldError::MalformedStepDefinition { .. } => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "did not exit normally".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
