//! External command hook used by steps (dependency install, generators, linters).
//!
//! The [`CommandRunner`] trait decouples the pipeline runner from process
//! spawning. Tests use recording runners that never spawn anything.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::config::ScaffoldConfig;
use crate::io::process::run_command;

/// Exit information for one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExit {
    /// Exit code, or `None` if the process was killed by a signal or timed out.
    pub code: Option<i32>,
    /// Captured stderr, for failure reports.
    pub stderr: String,
}

impl CommandExit {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a command line synchronously in a working directory.
pub trait CommandRunner {
    /// `Err` means the command could not be started; a non-zero exit is an `Ok` with that code.
    fn run(&self, workdir: &Path, command_line: &str) -> Result<CommandExit>;
}

/// Runs command lines through a shell (`sh -c` by default).
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: Vec<String>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl ShellCommandRunner {
    pub fn new(shell: Vec<String>, timeout: Option<Duration>, output_limit_bytes: usize) -> Self {
        Self {
            shell,
            timeout,
            output_limit_bytes,
        }
    }

    pub fn from_config(cfg: &ScaffoldConfig) -> Self {
        Self::new(
            cfg.shell.clone(),
            cfg.command_timeout(),
            cfg.command_output_limit_bytes,
        )
    }
}

impl CommandRunner for ShellCommandRunner {
    #[instrument(skip_all, fields(command = command_line))]
    fn run(&self, workdir: &Path, command_line: &str) -> Result<CommandExit> {
        let (program, args) = self
            .shell
            .split_first()
            .ok_or_else(|| anyhow!("shell is empty"))?;
        info!(workdir = %workdir.display(), "running command");

        let mut cmd = Command::new(program);
        cmd.args(args).arg(command_line).current_dir(workdir);
        let output = run_command(cmd, self.timeout, self.output_limit_bytes)?;

        let mut stderr = output.stderr_lossy();
        if output.timed_out {
            stderr.push_str("\n[command timed out]");
        }
        let code = if output.timed_out {
            None
        } else {
            output.status.code()
        };
        debug!(?code, "command exited");
        Ok(CommandExit { code, stderr })
    }
}
