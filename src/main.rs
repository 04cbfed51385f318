// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use extconv::ConverterConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, HistoryCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Convert {
            input,
            output_dir,
            max_size,
            no_history,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(limit) = max_size {
                anyhow::ensure!(limit > 0, "--max-size must be greater than zero");
                config.limits.max_package_size = limit;
            }
            let store = if no_history {
                None
            } else {
                Some(commands::open_history(cli.history_file)?)
            };
            commands::cmd_convert(
                commands::ConvertOptions {
                    input: &input,
                    output_dir: output_dir.as_deref(),
                    history: store.as_ref(),
                    quiet: cli.quiet,
                },
                &config,
            )
        }

        Some(Commands::Inspect { input }) => {
            let config = load_config(cli.config.as_deref())?;
            commands::cmd_inspect(&input, &config)
        }

        Some(Commands::History { command }) => {
            let store = commands::open_history(cli.history_file)?;
            match command {
                HistoryCommands::List { limit } => commands::cmd_history_list(&store, limit),
                HistoryCommands::Remove { id } => commands::cmd_history_remove(&store, &id),
                HistoryCommands::Clear => commands::cmd_history_clear(&store),
            }
        }

        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "extconv",
                &mut std::io::stdout(),
            );
            Ok(())
        }

        None => {
            // No command provided, show help
            println!("extconv v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'extconv --help' for usage information");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConverterConfig> {
    ConverterConfig::load(path).context("Failed to load configuration")
}
