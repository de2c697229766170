//! Template resources for `copy_template` mutations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::{Environment, UndefinedBehavior};
use tracing::debug;

use crate::core::guard::Options;
use crate::core::validate::check_relative_path;

/// Supplies template bytes by reference name.
pub trait TemplateProvider {
    fn resolve(&self, template_ref: &str) -> Result<Vec<u8>>;
}

/// Templates read from a directory; refs are paths relative to it.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    root: PathBuf,
}

impl DirTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateProvider for DirTemplates {
    fn resolve(&self, template_ref: &str) -> Result<Vec<u8>> {
        check_relative_path(Path::new(template_ref))
            .map_err(|reason| anyhow!("template {template_ref:?}: {reason}"))?;
        let path = self.root.join(template_ref);
        debug!(path = %path.display(), "resolving template");
        fs::read(&path).with_context(|| format!("read template {}", path.display()))
    }
}

/// Provider for pipelines that declare no templates; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateProvider for NoTemplates {
    fn resolve(&self, template_ref: &str) -> Result<Vec<u8>> {
        Err(anyhow!(
            "template {template_ref:?} requested but the pipeline declares no template directory"
        ))
    }
}

/// Render template source with the run options as variables.
///
/// Undefined variables are errors, so a missing `--set` fails the step instead
/// of silently producing an empty string.
pub fn render_template(name: &str, source: &[u8], options: &Options) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(source)
        .with_context(|| format!("template {name:?} is not valid UTF-8"))?;
    render_str(name, text, options).map(String::into_bytes)
}

/// [`render_template`] for inline text such as insert payloads.
pub fn render_str(name: &str, text: &str, options: &Options) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.add_template(name, text)
        .with_context(|| format!("parse template {name:?}"))?;
    env.get_template(name)
        .and_then(|template| template.render(options))
        .with_context(|| format!("render template {name:?}"))
}
