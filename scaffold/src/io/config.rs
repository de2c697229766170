//! Engine configuration stored under `.scaffold/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::guard::Options;

/// Scaffold configuration (TOML).
///
/// Edited by humans, so every field has a default and a missing file is the
/// same as an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Wall-clock limit for each external command. Unset means wait forever.
    pub command_timeout_secs: Option<u64>,

    /// Keep at most this many bytes of each command's stdout/stderr in memory.
    pub command_output_limit_bytes: usize,

    /// Program and leading arguments used to run command lines (e.g. `["sh","-c"]`).
    pub shell: Vec<String>,

    pub checkpoint: CheckpointConfig,

    /// Default run options; `--set key=value` overrides these.
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Commit after every applied step.
    pub enabled: bool,
    /// Prepended to the step name in each commit message.
    pub message_prefix: Option<String>,
    /// Refuse to start when the target has uncommitted changes outside `.scaffold/`.
    pub require_clean: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            message_prefix: None,
            require_clean: false,
        }
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: None,
            command_output_limit_bytes: 100_000,
            shell: vec!["sh".to_string(), "-c".to_string()],
            checkpoint: CheckpointConfig::default(),
            options: Options::new(),
        }
    }
}

impl ScaffoldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0 when set"));
        }
        if self.command_output_limit_bytes == 0 {
            return Err(anyhow!("command_output_limit_bytes must be > 0"));
        }
        if self.shell.is_empty() || self.shell[0].trim().is_empty() {
            return Err(anyhow!("shell must be a non-empty array"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScaffoldConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScaffoldConfig> {
    if !path.exists() {
        let cfg = ScaffoldConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScaffoldConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ScaffoldConfig::default());
        assert_eq!(cfg.command_timeout(), None);
    }

    #[test]
    fn partial_file_keeps_defaults_and_reads_options() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "command_timeout_secs = 600\n\n[checkpoint]\nmessage_prefix = \"scaffold: \"\n\n[options]\napi = true\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.command_timeout(), Some(Duration::from_secs(600)));
        assert!(cfg.checkpoint.enabled);
        assert_eq!(cfg.checkpoint.message_prefix.as_deref(), Some("scaffold: "));
        assert_eq!(cfg.options.get("api"), Some(&json!(true)));
        assert_eq!(cfg.shell, vec!["sh", "-c"]);
    }

    #[test]
    fn rejects_zero_timeout_and_empty_shell() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "command_timeout_secs = 0\n").expect("write");
        assert!(load_config(&path).is_err());

        fs::write(&path, "shell = []\n").expect("write");
        assert!(load_config(&path).is_err());
    }
}
