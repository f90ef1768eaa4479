//! Utility functions for CLI commands.

use speak_cli::config::{load_config, Config, Context};

use crate::Cli;

const APP_NAME: &str = "speak";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context configuration to use.
///
/// Without `-c` and without a current context, the defaults apply.
pub fn get_context(cli: &Cli) -> anyhow::Result<Context> {
    let cfg = get_config(cli)?;

    match (cfg.resolve_context(cli.context.as_deref()), cli.context.as_deref()) {
        (Some(ctx), _) => Ok(ctx.clone()),
        (None, None) => Ok(Context::default()),
        (None, Some(name)) => anyhow::bail!("context '{}' not found", name),
    }
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}
