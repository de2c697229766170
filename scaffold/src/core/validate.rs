//! Load-time checks on a pipeline definition.
//!
//! Everything here runs before any file is touched or command spawned.

use std::collections::HashSet;
use std::path::{Component, Path};

use super::types::{Mutation, Pipeline, Step};

/// Check definition invariants serde cannot express:
/// - pipeline name and step names are non-empty
/// - step names are unique
/// - every step declares at least one mutation or command
/// - command lines and insert payloads are non-empty
/// - mutation paths are relative and stay inside the target directory
/// - guards name an option key
pub fn validate_pipeline(pipeline: &Pipeline) -> Vec<String> {
    let mut errors = Vec::new();
    if pipeline.name.trim().is_empty() {
        errors.push("pipeline name must not be empty".to_string());
    }
    if pipeline.steps.is_empty() {
        errors.push("pipeline must contain at least one step".to_string());
    }

    let mut seen = HashSet::new();
    for (idx, step) in pipeline.steps.iter().enumerate() {
        let label = if step.name.trim().is_empty() {
            errors.push(format!("step #{}: name must not be empty", idx + 1));
            format!("step #{}", idx + 1)
        } else {
            format!("step {:?}", step.name)
        };
        if !step.name.trim().is_empty() && !seen.insert(step.name.as_str()) {
            errors.push(format!("duplicate step name {:?}", step.name));
        }
        validate_step(step, &label, &mut errors);
    }
    errors
}

fn validate_step(step: &Step, label: &str, errors: &mut Vec<String>) {
    if step.mutations.is_empty() && step.commands.is_empty() {
        errors.push(format!("{label}: declares no mutations and no commands"));
    }
    for (idx, command) in step.commands.iter().enumerate() {
        if command.trim().is_empty() {
            errors.push(format!("{label}: command #{} is empty", idx + 1));
        }
    }
    if let Some(guard) = &step.guard
        && guard.key().trim().is_empty()
    {
        errors.push(format!("{label}: guard option key must not be empty"));
    }
    for (idx, mutation) in step.mutations.iter().enumerate() {
        let at = format!("{label} mutation #{} ({})", idx + 1, mutation.kind());
        if let Err(reason) = check_relative_path(mutation.target()) {
            errors.push(format!("{at}: {reason}"));
        }
        if let Mutation::InsertAfter { payload, .. } | Mutation::InsertBefore { payload, .. } =
            mutation
            && payload.is_empty()
        {
            errors.push(format!("{at}: payload must not be empty"));
        }
        if let Mutation::CopyTemplate { template, dest: Some(_), .. } = mutation
            && let Err(reason) = check_relative_path(Path::new(template))
        {
            errors.push(format!("{at}: template {reason}"));
        }
    }
}

/// Reject empty, absolute, and parent-escaping paths.
pub fn check_relative_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("path must not be empty".to_string());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("path {} must not contain '..'", path.display()));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path {} must be relative", path.display()));
            }
        }
    }
    Ok(())
}
