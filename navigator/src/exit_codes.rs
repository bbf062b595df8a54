//! Stable exit codes for navigator CLI commands.

/// Command succeeded; for `run`, every planned location was reached.
pub const OK: i32 = 0;
/// Invalid config, unreadable input, or a trace that violates invariants.
pub const INVALID: i32 = 1;
/// `navigator run` finished but at least one location was not reached.
pub const INCOMPLETE: i32 = 2;
