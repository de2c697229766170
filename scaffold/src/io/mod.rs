//! Side-effecting collaborators: filesystem, processes, git, persisted state.

pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod git;
pub mod init;
pub mod pipeline_file;
pub mod process;
pub mod run_state;
pub mod templates;
pub mod workspace;
