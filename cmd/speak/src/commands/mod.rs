//! CLI commands module.

mod config;
mod say;
mod util;

pub use config::ConfigCommand;
pub use say::SayCommand;

pub(crate) use util::*;
