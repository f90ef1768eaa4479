//! Configuration management commands.

use clap::{Args, Subcommand};
use speak_cli::output::print_success;
use speak_cli::Context as CliContext;

use super::get_config;
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts hold reader settings (language, keep-alive interval, speaking
/// rate), similar to kubectl's context management.
///
/// Configuration is stored in ~/.speak/speak/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// BCP 47 language tag
        #[arg(long)]
        language: Option<String>,
        /// Seconds between keep-alive pause/resume cycles
        #[arg(long)]
        keep_alive: Option<u64>,
        /// Speaking rate in words per minute
        #[arg(long)]
        wpm: Option<u32>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                language,
                keep_alive,
                wpm,
            } => {
                if let Some(lang) = language {
                    if lang.trim().is_empty() {
                        anyhow::bail!("language must be a valid BCP 47 tag");
                    }
                }

                let mut cfg = get_config(cli)?;
                let ctx = CliContext {
                    language: language.clone().unwrap_or_default(),
                    keep_alive_secs: keep_alive.unwrap_or(0),
                    words_per_minute: wpm.unwrap_or(0),
                    ..Default::default()
                };
                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                println!("{:<8} {:<20} {:<12} {:<12} {}", "CURRENT", "NAME", "LANGUAGE", "KEEP_ALIVE", "WPM");
                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.contexts.get(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    println!(
                        "{:<8} {:<20} {:<12} {:<12} {}",
                        current,
                        name,
                        ctx.language(),
                        format!("{}s", ctx.keep_alive().as_secs()),
                        ctx.words_per_minute()
                    );
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.contexts.get(name) else {
                        continue;
                    };
                    println!("\n  {}:", name);
                    println!("    Language: {}", ctx.language());
                    println!("    Keep-alive: {}s", ctx.keep_alive().as_secs());
                    println!("    Rate: {} wpm", ctx.words_per_minute());
                }

                Ok(())
            }
        }
    }
}
