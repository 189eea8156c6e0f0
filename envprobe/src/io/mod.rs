//! Side-effecting helpers: the process environment, child processes, staged
//! files, configuration and report delivery.

pub mod config;
pub mod environ;
pub mod probe;
pub mod process;
pub mod report;
pub mod staging;
