//! Test-only collaborators and fixtures.
//!
//! Recording fakes stand in for processes, git and template storage so
//! pipeline tests can assert on exactly what the runner asked for.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::anchor::Anchor;
use crate::core::guard::Options;
use crate::core::types::{Mutation, Pipeline, Step};
use crate::io::checkpoint::CheckpointSink;
use crate::io::commands::{CommandExit, CommandRunner};
use crate::io::git::Git;
use crate::io::templates::TemplateProvider;

/// Records every command line; commands registered with `fail_with` exit non-zero.
#[derive(Debug, Default)]
pub struct RecordingCommands {
    calls: RefCell<Vec<String>>,
    failures: BTreeMap<String, i32>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(mut self, command: &str, code: i32) -> Self {
        self.failures.insert(command.to_string(), code);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingCommands {
    fn run(&self, _workdir: &Path, command_line: &str) -> Result<CommandExit> {
        self.calls.borrow_mut().push(command_line.to_string());
        match self.failures.get(command_line) {
            Some(code) => Ok(CommandExit {
                code: Some(*code),
                stderr: format!("{command_line} failed"),
            }),
            None => Ok(CommandExit::ok()),
        }
    }
}

/// Records checkpoint messages; optionally refuses one.
#[derive(Debug, Default)]
pub struct RecordingCheckpoint {
    commits: RefCell<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(step: &str) -> Self {
        Self {
            commits: RefCell::default(),
            fail_on: Some(step.to_string()),
        }
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.borrow().clone()
    }
}

impl CheckpointSink for RecordingCheckpoint {
    fn commit(&self, message: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(message) {
            return Err(anyhow!("refusing checkpoint for {message}"));
        }
        self.commits.borrow_mut().push(message.to_string());
        Ok(())
    }
}

/// In-memory templates keyed by reference name.
#[derive(Debug, Default)]
pub struct MemoryTemplates {
    templates: BTreeMap<String, Vec<u8>>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, content: &str) -> Self {
        self.templates
            .insert(name.to_string(), content.as_bytes().to_vec());
        self
    }
}

impl TemplateProvider for MemoryTemplates {
    fn resolve(&self, template_ref: &str) -> Result<Vec<u8>> {
        self.templates
            .get(template_ref)
            .cloned()
            .ok_or_else(|| anyhow!("unknown template {template_ref:?}"))
    }
}

/// A temporary target directory.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        Ok(fs::read_to_string(self.dir.path().join(rel))?)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    /// Every regular file outside `.scaffold/` and `.git/`, with content, sorted by path.
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, String>> {
        let mut files = BTreeMap::new();
        collect_files(self.dir.path(), self.dir.path(), &mut files)?;
        Ok(files)
    }

    /// Initialize a git repository with a local identity.
    pub fn init_git(&self) -> Result<Git> {
        let git = Git::new(self.dir.path());
        git.init()?;
        git.set_config("user.name", "Scaffold Test")?;
        git.set_config("user.email", "scaffold-test@local.invalid")?;
        git.set_config("commit.gpgsign", "false")?;
        Ok(git)
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().map(|n| n.to_string_lossy().to_string());
        if matches!(name.as_deref(), Some(".git") | Some(".scaffold")) {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel = path.strip_prefix(root)?.to_path_buf();
            out.insert(rel, fs::read_to_string(&path)?);
        }
    }
    Ok(())
}

/// `insert_after` with a literal anchor.
pub fn insert_after(file: &str, anchor: &str, payload: &str) -> Mutation {
    Mutation::InsertAfter {
        file: file.into(),
        anchor: Anchor::literal(anchor),
        payload: payload.to_string(),
        idempotent_safe: false,
        render: false,
    }
}

/// `insert_before` with a literal anchor.
pub fn insert_before(file: &str, anchor: &str, payload: &str) -> Mutation {
    Mutation::InsertBefore {
        file: file.into(),
        anchor: Anchor::literal(anchor),
        payload: payload.to_string(),
        idempotent_safe: false,
        render: false,
    }
}

pub fn write_new(dest: &str, content: &str) -> Mutation {
    Mutation::WriteNew {
        dest: dest.into(),
        content: content.to_string(),
    }
}

/// Step with mutations, no commands, no guard.
pub fn step(name: &str, mutations: Vec<Mutation>) -> Step {
    Step {
        name: name.to_string(),
        mutations,
        commands: Vec::new(),
        guard: None,
    }
}

pub fn pipeline(name: &str, steps: Vec<Step>) -> Pipeline {
    Pipeline {
        name: name.to_string(),
        templates: None,
        options: Options::new(),
        steps,
    }
}
