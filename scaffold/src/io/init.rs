//! Layout of the engine-owned `.scaffold/` directory inside a target.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directory name, relative to the target root.
pub const STATE_DIR: &str = ".scaffold";

/// Ignores everything in `.scaffold/`, including this file, so checkpoint
/// commits never pick up run state.
const STATE_GITIGNORE: &str = "*\n";

/// All canonical paths within `.scaffold/` for a target root.
#[derive(Debug, Clone)]
pub struct ScaffoldPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub run_state_path: PathBuf,
    pub config_path: PathBuf,
}

impl ScaffoldPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(STATE_DIR);
        Self {
            root: root.clone(),
            state_dir: state_dir.clone(),
            gitignore_path: state_dir.join(".gitignore"),
            run_state_path: state_dir.join("run_state.json"),
            config_path: state_dir.join("config.toml"),
        }
    }

    /// Prefix for `git status` paths that belong to the engine.
    pub fn ignored_prefix() -> String {
        format!("{STATE_DIR}/")
    }
}

/// Create `.scaffold/` and its `.gitignore` if missing. Existing files are kept.
pub fn init_state_dir(root: &Path) -> Result<ScaffoldPaths> {
    let paths = ScaffoldPaths::new(root);
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create directory {}", paths.state_dir.display()))?;
    if !paths.gitignore_path.exists() {
        fs::write(&paths.gitignore_path, STATE_GITIGNORE)
            .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    }
    Ok(paths)
}
