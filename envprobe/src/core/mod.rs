//! Deterministic, pure logic shared by the probe.
//!
//! Core modules must not read or mutate the process environment or spawn
//! processes. They operate on in-memory data and return deterministic outputs
//! suitable for tests.

pub mod annotation;
pub mod catalog;
pub mod diff;
pub mod marker;
pub mod types;
