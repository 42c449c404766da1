//! Grimoire CLI
//!
//! Command-line interface for Grimoire - keeps a local tabletop library in
//! step with a remote account.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use grimoire_core::Config;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "grimoire")]
#[command(about = "Grimoire - sync your tabletop library with your account")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output (overridden by GRIMOIRE_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every local record the account is missing
    Sync,
    /// Remote account operations
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Upgrade saved encounters to the current format
    Migrate {
        /// JSON file holding one encounter or an array of them
        file: PathBuf,
        /// Save the migrated encounters into the local library
        #[arg(long)]
        write: bool,
    },
    /// Print the id a record with this name would get
    Id {
        /// Record name
        name: String,
        /// Folder path of the record
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Show configuration and local library counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Show the signed-in account
    Show,
    /// Download the full account export
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Delete the account and everything in it
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, account_url, storage_enabled, batch_size, request_timeout_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even when the file can't be parsed
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config = Config::load_with_cli_override(config_path)?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Sync => commands::sync::sync(&config, &output).await,
        Commands::Account { command } => match command {
            AccountCommands::Show => commands::account::show(&config, &output).await,
            AccountCommands::Export { out } => {
                commands::account::export(&config, out, &output).await
            }
            AccountCommands::Delete { yes } => {
                commands::account::delete(&config, yes, &output).await
            }
        },
        Commands::Migrate { file, write } => {
            commands::migrate::migrate(&config, &file, write, &output)
        }
        Commands::Id { name, path } => commands::id::show(&name, path.as_deref(), &output),
        Commands::Status => commands::status::show(&config, &output).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Set up tracing
///
/// The level comes from GRIMOIRE_LOG, then --verbose, then warnings only.
/// Logs go to the configured log file, or stderr when none is set.
fn init_logging(config: &Config, verbose: bool) {
    let log_level = std::env::var("GRIMOIRE_LOG").unwrap_or_else(|_| {
        if verbose {
            "debug".to_string()
        } else {
            "warn".to_string()
        }
    });
    let env_filter = EnvFilter::new(format!(
        "grimoire_core={},grimoire_cli={}",
        log_level, log_level
    ));

    let Some(log_path) = config.log_file.clone() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging to {:?}", log_path);
}
