//! Target directory access with per-step, all-or-nothing writes.
//!
//! A step's edits accumulate in a [`Stage`]. Nothing reaches disk until every
//! mutation of the step succeeded; then all changed files are written to temp
//! siblings and renamed into place. A dry run keeps the changes in an
//! in-memory overlay instead, so later steps still see earlier output.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};

const TMP_SUFFIX: &str = "scaffold-tmp";

/// The target directory a pipeline mutates.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    dry_run: bool,
    overlay: BTreeMap<PathBuf, Vec<u8>>,
}

/// Pending edits for one step, keyed by path relative to the workspace root.
#[derive(Debug, Default)]
pub struct Stage {
    files: BTreeMap<PathBuf, StagedFile>,
}

#[derive(Debug)]
struct StagedFile {
    original: Option<Vec<u8>>,
    current: Option<Vec<u8>>,
}

/// Files a step wrote, with their previous content for [`Workspace::restore`].
#[derive(Debug, Default)]
pub struct Written {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl Written {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|(path, _)| path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Stage {
    /// Current staged content of `rel`, loading it from the workspace on first use.
    pub fn content(&mut self, workspace: &Workspace, rel: &Path) -> Result<Option<&[u8]>> {
        if !self.files.contains_key(rel) {
            let original = workspace.read(rel)?;
            self.files.insert(
                rel.to_path_buf(),
                StagedFile {
                    current: original.clone(),
                    original,
                },
            );
        }
        Ok(self
            .files
            .get(rel)
            .and_then(|file| file.current.as_deref()))
    }

    /// Replace the staged content of `rel`. The file must have been loaded via [`Stage::content`].
    pub fn set(&mut self, rel: &Path, content: Vec<u8>) -> Result<()> {
        let file = self
            .files
            .get_mut(rel)
            .ok_or_else(|| anyhow!("{} was not loaded before staging", rel.display()))?;
        file.current = Some(content);
        Ok(())
    }

    /// Paths whose staged content differs from what was read.
    pub fn changed_paths(&self) -> Vec<PathBuf> {
        self.changed().map(|(path, _)| path.clone()).collect()
    }

    fn changed(&self) -> impl Iterator<Item = (&PathBuf, &StagedFile)> {
        self.files
            .iter()
            .filter(|(_, file)| file.current.is_some() && file.current != file.original)
    }
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
            overlay: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Read a file relative to the root. `None` if it does not exist.
    pub fn read(&self, rel: &Path) -> Result<Option<Vec<u8>>> {
        if let Some(content) = self.overlay.get(rel) {
            return Ok(Some(content.clone()));
        }
        let path = self.root.join(rel);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
        }
    }

    /// Write every changed file of `stage`, or none of them.
    #[instrument(skip_all, fields(dry_run = self.dry_run))]
    pub fn commit(&mut self, stage: Stage) -> Result<Written> {
        let mut written = Written::default();
        let changed: Vec<(PathBuf, Option<Vec<u8>>, Vec<u8>)> = stage
            .changed()
            .filter_map(|(path, file)| {
                file.current
                    .clone()
                    .map(|current| (path.clone(), file.original.clone(), current))
            })
            .collect();
        if changed.is_empty() {
            return Ok(written);
        }

        if self.dry_run {
            for (path, original, current) in changed {
                debug!(path = %path.display(), "staging change in overlay");
                self.overlay.insert(path.clone(), current);
                written.files.push((path, original));
            }
            return Ok(written);
        }

        let mut temps = Vec::with_capacity(changed.len());
        for (path, _, current) in &changed {
            let target = self.root.join(path);
            match write_temp(&target, current) {
                Ok(tmp) => temps.push((tmp, target)),
                Err(err) => {
                    remove_temps(&temps);
                    return Err(err);
                }
            }
        }

        for (idx, (tmp, target)) in temps.iter().enumerate() {
            if let Err(err) = fs::rename(tmp, target) {
                warn!(path = %target.display(), "rename failed, undoing step writes");
                remove_temps(&temps[idx..]);
                if let Err(restore_err) = self.restore(&written) {
                    let detail = format!("{restore_err:#}");
                    error!(err = %detail, "failed to restore files after rename failure");
                }
                return Err(err).with_context(|| format!("replace {}", target.display()));
            }
            let (path, original, _) = &changed[idx];
            debug!(path = %path.display(), "wrote file");
            written.files.push((path.clone(), original.clone()));
        }
        Ok(written)
    }

    /// Put back the content a step replaced; files it created are removed.
    #[instrument(skip_all, fields(files = written.files.len()))]
    pub fn restore(&mut self, written: &Written) -> Result<()> {
        for (path, original) in written.files.iter().rev() {
            if self.dry_run {
                match original {
                    Some(content) => self.overlay.insert(path.clone(), content.clone()),
                    None => self.overlay.remove(path),
                };
                continue;
            }
            let target = self.root.join(path);
            match original {
                Some(content) => {
                    let tmp = write_temp(&target, content)?;
                    fs::rename(&tmp, &target)
                        .with_context(|| format!("restore {}", target.display()))?;
                }
                None => match fs::remove_file(&target) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => {
                        return Err(err).with_context(|| format!("remove {}", target.display()));
                    }
                },
            }
            debug!(path = %path.display(), "restored file");
        }
        Ok(())
    }
}

fn temp_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", target.display()))?;
    Ok(target.with_file_name(format!(".{}.{TMP_SUFFIX}", name.to_string_lossy())))
}

fn write_temp(target: &Path, content: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp = temp_path(target)?;
    fs::write(&tmp, content).with_context(|| format!("write temp file {}", tmp.display()))?;
    Ok(tmp)
}

fn remove_temps(temps: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in temps {
        if let Err(err) = fs::remove_file(tmp) {
            warn!(path = %tmp.display(), err = %err, "failed to remove temp file");
        }
    }
}
