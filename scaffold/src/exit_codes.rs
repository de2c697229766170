//! Stable exit codes for scaffold CLI commands.

/// Every step applied, skipped, or (dry run) planned.
pub const OK: i32 = 0;
/// A step failed; its name is printed to stderr.
pub const STEP_FAILED: i32 = 1;
/// The pipeline definition, config, or run state is invalid. Nothing was touched.
pub const INVALID: i32 = 2;
