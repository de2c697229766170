//! Declarative project-scaffolding engine.
//!
//! A pipeline is an ordered list of named steps. Each step edits files in a
//! freshly generated project through content anchors, optionally runs external
//! commands, and is checkpointed (by default as one git commit) before the next
//! step starts. Re-running a pipeline skips checkpointed steps, and every
//! mutation is idempotent, so a failed run can be fixed and resumed.
//!
//! - **[`core`]**: Pure, deterministic logic (anchor matching, mutations,
//!   guards, definition validation). No I/O.
//! - **[`io`]**: Side-effecting collaborators (filesystem staging, processes,
//!   git, templates, persisted run state and config).
//!
//! [`pipeline`] coordinates the two to run a pipeline; `main.rs` is a thin CLI
//! over it.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
