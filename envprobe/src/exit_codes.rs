//! Stable exit codes for envprobe CLI commands.

/// `probe` and `list` succeeded.
pub const OK: i32 = 0;
/// Invalid invocation, configuration, staging or report delivery error.
pub const INVALID: i32 = 1;
/// `run` delivered its report. Every completed run exits with this code.
pub const REPORTED: i32 = 2;
