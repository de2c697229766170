//! Orchestration: run a pipeline's steps in order against one target directory.
//!
//! Per step: skip it if already checkpointed or guarded off; otherwise stage
//! every mutation in memory, write the step's files all-or-nothing, run its
//! commands, checkpoint, and only then record the step as completed. The first
//! failure halts the pipeline.

use std::borrow::Cow;
use std::path::PathBuf;

use tracing::{debug, error, info, info_span, warn};

use crate::core::anchor::locate_all;
use crate::core::guard::{Options, layered};
use crate::core::mutator::{self, Edit, Outcome};
use crate::core::types::{Mutation, Pipeline, Step};
use crate::core::validate::validate_pipeline;
use crate::error::ScaffoldError;
use crate::io::checkpoint::CheckpointSink;
use crate::io::commands::CommandRunner;
use crate::io::run_state::{RunState, write_run_state};
use crate::io::templates::{TemplateProvider, render_str, render_template};
use crate::io::workspace::{Stage, Workspace, Written};

/// External capabilities the runner depends on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub commands: &'a dyn CommandRunner,
    pub checkpoint: &'a dyn CheckpointSink,
    pub templates: &'a dyn TemplateProvider,
}

/// Why a step did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already recorded in the run state.
    Completed,
    /// Guard evaluated false for the run options.
    Guard,
}

/// Terminal status of a step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Skipped(SkipReason),
    /// Files written, commands run, checkpoint recorded.
    Applied { files: Vec<PathBuf>, commands: usize },
    /// Dry run: files that would change. No commands or checkpoints ran.
    Planned { files: Vec<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn status(&self, step: &str) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|report| report.name == step)
            .map(|report| &report.status)
    }
}

/// Runs pipelines against one workspace.
pub struct PipelineRunner<'a> {
    workspace: Workspace,
    options: &'a Options,
    hooks: Collaborators<'a>,
    state_path: Option<PathBuf>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(workspace: Workspace, options: &'a Options, hooks: Collaborators<'a>) -> Self {
        Self {
            workspace,
            options,
            hooks,
            state_path: None,
        }
    }

    /// Persist the run state here after every completed step.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run every step of `pipeline` in declaration order.
    ///
    /// The runner's options are layered over the pipeline's `[options]` defaults.
    ///
    /// `state` is updated in place as steps complete, so on error it still
    /// reflects every checkpointed step and can be passed to a later run.
    pub fn run(
        &mut self,
        pipeline: &Pipeline,
        state: &mut RunState,
    ) -> Result<RunReport, ScaffoldError> {
        let errors = validate_pipeline(pipeline);
        if !errors.is_empty() {
            return Err(ScaffoldError::MalformedStepDefinition { reasons: errors });
        }
        if state.pipeline != pipeline.name {
            return Err(ScaffoldError::malformed(format!(
                "run state belongs to pipeline '{}', not '{}'",
                state.pipeline, pipeline.name
            )));
        }
        for name in &state.completed_steps {
            if pipeline.step(name).is_none() {
                warn!(step = %name, "completed step is not part of the pipeline");
            }
        }

        let options = layered(&pipeline.options, self.options);
        let mut report = RunReport::default();
        for step in &pipeline.steps {
            let _span = info_span!("step", name = %step.name).entered();
            let status = self.run_step(step, state, &options).inspect_err(|err| {
                error!(err = %err, "step failed, halting pipeline");
            })?;
            report.steps.push(StepReport {
                name: step.name.clone(),
                status,
            });
        }
        Ok(report)
    }

    fn run_step(
        &mut self,
        step: &Step,
        state: &mut RunState,
        options: &Options,
    ) -> Result<StepStatus, ScaffoldError> {
        if state.is_completed(&step.name) {
            info!("skipping completed step");
            return Ok(StepStatus::Skipped(SkipReason::Completed));
        }
        if let Some(guard) = &step.guard
            && !guard.allows(options)
        {
            info!(option = guard.key(), "skipping step, guard is false");
            return Ok(StepStatus::Skipped(SkipReason::Guard));
        }

        info!("applying step");
        let stage = self.stage_mutations(step, options)?;
        let files = stage.changed_paths();

        if self.workspace.is_dry_run() {
            self.workspace
                .commit(stage)
                .map_err(|source| io_error(step, source))?;
            return Ok(StepStatus::Planned { files });
        }

        let written = self
            .workspace
            .commit(stage)
            .map_err(|source| io_error(step, source))?;
        self.run_commands(step, &written)?;

        self.hooks
            .checkpoint
            .commit(&step.name)
            .map_err(|source| ScaffoldError::CheckpointFailed {
                step: step.name.clone(),
                source,
            })?;
        state.mark_completed(&step.name);
        if let Some(path) = &self.state_path {
            write_run_state(path, state).map_err(|source| ScaffoldError::CheckpointFailed {
                step: step.name.clone(),
                source,
            })?;
        }
        info!(files = files.len(), "step applied");
        Ok(StepStatus::Applied {
            files,
            commands: step.commands.len(),
        })
    }

    /// Apply every mutation in memory. Later mutations see earlier output.
    fn stage_mutations(&self, step: &Step, options: &Options) -> Result<Stage, ScaffoldError> {
        let mut stage = Stage::default();
        for mutation in &step.mutations {
            let rel = mutation.target();
            let edit = self.resolve_edit(step, mutation, options)?;
            let outcome = {
                let current = stage
                    .content(&self.workspace, rel)
                    .map_err(|source| io_error(step, source))?;
                if let Edit::Replace { pattern, .. } = &edit
                    && let Some(text) = current.and_then(|bytes| std::str::from_utf8(bytes).ok())
                {
                    let matches = locate_all(text, pattern).len();
                    debug!(file = %rel.display(), matches, "replace pattern matches");
                }
                mutator::apply(current, &edit).map_err(|err| {
                    ScaffoldError::from_mutation(&step.name, rel.to_path_buf(), err)
                })?
            };
            match outcome {
                Outcome::Changed(content) => {
                    debug!(kind = mutation.kind(), file = %rel.display(), "mutation changed file");
                    stage
                        .set(rel, content)
                        .map_err(|source| io_error(step, source))?;
                }
                Outcome::Unchanged => {
                    debug!(kind = mutation.kind(), file = %rel.display(), "mutation already applied");
                }
            }
        }
        Ok(stage)
    }

    fn resolve_edit<'m>(
        &self,
        step: &Step,
        mutation: &'m Mutation,
        options: &Options,
    ) -> Result<Edit<'m>, ScaffoldError> {
        let edit = match mutation {
            Mutation::InsertAfter {
                anchor,
                payload,
                idempotent_safe,
                render,
                ..
            } => Edit::InsertAfter {
                anchor,
                payload: inline_text(step, "payload", payload, *render, options)?,
                idempotent_safe: *idempotent_safe,
            },
            Mutation::InsertBefore {
                anchor,
                payload,
                idempotent_safe,
                render,
                ..
            } => Edit::InsertBefore {
                anchor,
                payload: inline_text(step, "payload", payload, *render, options)?,
                idempotent_safe: *idempotent_safe,
            },
            Mutation::Replace {
                pattern,
                replacement,
                first_only,
                render,
                ..
            } => Edit::Replace {
                pattern,
                replacement: inline_text(step, "replacement", replacement, *render, options)?,
                first_only: *first_only,
            },
            Mutation::CopyTemplate {
                template, render, ..
            } => {
                let source = self
                    .hooks
                    .templates
                    .resolve(template)
                    .map_err(|source| io_error(step, source))?;
                let content = if *render {
                    render_template(template, &source, options)
                        .map_err(|source| io_error(step, source))?
                } else {
                    source
                };
                Edit::Write { content }
            }
            Mutation::WriteNew { content, .. } => Edit::Write {
                content: content.as_bytes().to_vec(),
            },
        };
        Ok(edit)
    }

    /// Run the step's commands; on failure undo the step's file writes.
    fn run_commands(&mut self, step: &Step, written: &Written) -> Result<(), ScaffoldError> {
        for command in &step.commands {
            let failure = match self.hooks.commands.run(self.workspace.root(), command) {
                Ok(exit) if exit.success() => continue,
                Ok(exit) => (exit.code, exit.stderr),
                Err(err) => (None, format!("{err:#}")),
            };
            self.undo(step, written);
            return Err(ScaffoldError::ExternalCommandFailed {
                step: step.name.clone(),
                command: command.clone(),
                code: failure.0,
                stderr: failure.1,
            });
        }
        Ok(())
    }

    fn undo(&mut self, step: &Step, written: &Written) {
        if written.is_empty() {
            return;
        }
        warn!(files = ?written.paths(), "restoring files written by failed step");
        if let Err(err) = self.workspace.restore(written) {
            let detail = format!("{err:#}");
            error!(step = %step.name, err = %detail, "failed to restore step files");
        }
    }
}

/// Payload or replacement text, rendered with the options when `render` is set.
fn inline_text<'m>(
    step: &Step,
    name: &str,
    raw: &'m str,
    render: bool,
    options: &Options,
) -> Result<Cow<'m, str>, ScaffoldError> {
    if !render {
        return Ok(Cow::Borrowed(raw));
    }
    render_str(name, raw, options)
        .map(Cow::Owned)
        .map_err(|source| io_error(step, source))
}

fn io_error(step: &Step, source: anyhow::Error) -> ScaffoldError {
    ScaffoldError::Io {
        step: step.name.clone(),
        source,
    }
}

