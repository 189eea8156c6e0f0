//! Environment propagation probe.
//!
//! Applies a fixed sequence of environment mutations to the running process
//! and, around each one, reads the affected variable through two in-process
//! accessors and through a freshly spawned child. The readings are collected
//! into an annotation report; divergence between channels is the result, not
//! an error.
//!
//! - **[`core`]**: Pure logic (catalog, marker protocol, annotations, diffs).
//! - **[`io`]**: Environment access, child processes, staging, config, reports.
//!
//! [`collect`] and [`scenario`] combine the two into a run.

pub mod collect;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod scenario;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
