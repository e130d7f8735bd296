//! CLI module for headless export
//!
//! Runs the export without any UI, configured via environment variables.

mod config;
mod runner;

pub use runner::run;
