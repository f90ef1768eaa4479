//! CLI utilities for speak.
//!
//! This crate provides configuration and output helpers shared by the
//! speak binaries.

pub mod config;
pub mod output;

pub use config::{Config, Context};
pub use output::{Output, OutputFormat};
