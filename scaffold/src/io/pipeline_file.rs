//! Pipeline definition storage (TOML).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::types::Pipeline;
use crate::core::validate::validate_pipeline;
use crate::error::ScaffoldError;

/// Parse and validate a pipeline definition.
///
/// Any problem, syntactic or semantic, is a `MalformedStepDefinition`; nothing
/// has been touched yet when this fails.
pub fn parse_pipeline(raw: &str) -> Result<Pipeline, ScaffoldError> {
    let pipeline: Pipeline = toml::from_str(raw)
        .map_err(|err| ScaffoldError::malformed(format!("parse pipeline: {err}")))?;
    let errors = validate_pipeline(&pipeline);
    if !errors.is_empty() {
        return Err(ScaffoldError::MalformedStepDefinition { reasons: errors });
    }
    Ok(pipeline)
}

/// Read, parse and validate a pipeline file.
pub fn load_pipeline(path: &Path) -> Result<Pipeline, ScaffoldError> {
    debug!(path = %path.display(), "loading pipeline");
    let raw = fs::read_to_string(path)
        .map_err(|err| ScaffoldError::malformed(format!("read {}: {err}", path.display())))?;
    let pipeline = parse_pipeline(&raw)?;
    debug!(name = %pipeline.name, steps = pipeline.steps.len(), "pipeline loaded");
    Ok(pipeline)
}

/// Template directory of a pipeline; relative paths resolve next to the pipeline file.
pub fn templates_dir(pipeline: &Pipeline, pipeline_file: &Path) -> Option<PathBuf> {
    let dir = pipeline.templates.as_ref()?;
    if dir.is_absolute() {
        return Some(dir.clone());
    }
    let base = pipeline_file.parent().unwrap_or_else(|| Path::new("."));
    Some(base.join(dir))
}
