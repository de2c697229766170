//! Declarative pipeline definition types.
//!
//! These mirror the on-disk TOML layout one to one. They carry no I/O and are
//! validated once at load time (see [`crate::core::validate`]).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::anchor::Anchor;
use super::guard::{Guard, Options};

/// Ordered list of steps applied to one target directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    /// Pipeline identity, recorded in run state to refuse resuming a different pipeline.
    pub name: String,
    /// Template root, relative to the pipeline file unless absolute.
    #[serde(default)]
    pub templates: Option<PathBuf>,
    /// Default option values; config `[options]` and `--set` override them.
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.name == name)
    }
}

/// Unit of checkpointing: named mutations plus the commands that follow them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
    /// Command lines run after the step's files are written, in order.
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub guard: Option<Guard>,
}

/// One file edit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    InsertAfter {
        file: PathBuf,
        anchor: Anchor,
        payload: String,
        /// Treat a missing anchor as success when the payload is already present.
        #[serde(default)]
        idempotent_safe: bool,
        /// Render the payload with the run options before inserting.
        #[serde(default)]
        render: bool,
    },
    InsertBefore {
        file: PathBuf,
        anchor: Anchor,
        payload: String,
        #[serde(default)]
        idempotent_safe: bool,
        #[serde(default)]
        render: bool,
    },
    Replace {
        file: PathBuf,
        pattern: Anchor,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        first_only: bool,
        /// Render the replacement with the run options. Rendering happens
        /// before `$1`-style group expansion.
        #[serde(default)]
        render: bool,
    },
    CopyTemplate {
        template: String,
        /// Destination path; defaults to the template name.
        #[serde(default)]
        dest: Option<PathBuf>,
        /// Render through the template engine with the run options as context.
        #[serde(default)]
        render: bool,
    },
    WriteNew {
        dest: PathBuf,
        content: String,
    },
}

impl Mutation {
    /// File this mutation reads and writes, relative to the target directory.
    pub fn target(&self) -> &Path {
        match self {
            Mutation::InsertAfter { file, .. }
            | Mutation::InsertBefore { file, .. }
            | Mutation::Replace { file, .. } => file,
            Mutation::CopyTemplate { template, dest, .. } => {
                dest.as_deref().unwrap_or_else(|| Path::new(template.as_str()))
            }
            Mutation::WriteNew { dest, .. } => dest,
        }
    }

    /// Anchor or pattern, for text mutations.
    pub fn anchor(&self) -> Option<&Anchor> {
        match self {
            Mutation::InsertAfter { anchor, .. } | Mutation::InsertBefore { anchor, .. } => {
                Some(anchor)
            }
            Mutation::Replace { pattern, .. } => Some(pattern),
            Mutation::CopyTemplate { .. } | Mutation::WriteNew { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::InsertAfter { .. } => "insert_after",
            Mutation::InsertBefore { .. } => "insert_before",
            Mutation::Replace { .. } => "replace",
            Mutation::CopyTemplate { .. } => "copy_template",
            Mutation::WriteNew { .. } => "write_new",
        }
    }
}
