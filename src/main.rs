use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use save_scummer::cli::{
    handle_add_command, handle_backup_command, handle_config_command, handle_ls_command,
    handle_restore_command, AddArgs, BackupArgs, RestoreArgs,
};
use save_scummer::config::{GameStore, ScummerPaths};
use save_scummer::ScummerError;

/// Environment variable holding the log filter, e.g. `SSC_LOG=debug`
const LOG_ENV: &str = "SSC_LOG";

#[derive(Parser)]
#[command(
    name = "ssc",
    version,
    about = "Save Scummer: a save game backup and restore tool",
    long_about = "Save Scummer backs up and restores game saves. Add a game's save \
                  directory once, then make a backup before every risky decision \
                  and roll back to any of them by index, age or date."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a game and its save directory, or update an existing game
    Add(AddArgs),

    /// List configured games, or show details on one game and its backups
    #[command(alias = "list")]
    Ls {
        /// Game title
        title: Option<String>,
    },

    /// Create a backup of one, multiple, or all games
    Backup(BackupArgs),

    /// Restore a backup of a game
    Restore(RestoreArgs),

    /// Show configuration paths
    Config {
        /// Directory to store backups in
        #[arg(long)]
        backup_dir: Option<String>,
    },
}

/// Log to a file in the data directory, or warnings to stderr if it can't be opened
fn init_logging(paths: &ScummerPaths) {
    let filter = |default: &str| {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
    };

    let log_file = paths.ensure_directories().ok().and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths.log_file())
            .ok()
    });

    let builder = tracing_subscriber::fmt().with_target(false);
    match log_file {
        Some(file) => builder
            .with_env_filter(filter("info"))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => builder
            .with_env_filter(filter("warn"))
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = ScummerPaths::new()?;
    init_logging(&paths);

    let mut store = GameStore::load(paths)?;
    let now = Local::now();

    match cli.command {
        Commands::Add(args) => {
            handle_add_command(&mut store, args)?;
            store.save()?;
        }
        Commands::Ls { title } => handle_ls_command(&store, title.as_deref(), now)?,
        Commands::Backup(args) => {
            let summary = handle_backup_command(&mut store, args)?;
            if summary.succeeded > 0 {
                store.save()?;
            }
            if !summary.all_succeeded() {
                bail!(
                    "{} backup(s) failed: {}",
                    summary.failed.len(),
                    summary.failed.join(", ")
                );
            }
        }
        Commands::Restore(args) => handle_restore_command(&store, args, now)?,
        Commands::Config { backup_dir } => {
            if handle_config_command(&mut store, backup_dir)? {
                store.save()?;
            }
        }
    }

    Ok(())
}

fn hint(error: &ScummerError) -> Option<&'static str> {
    if error.is_not_found() {
        Some("Run 'ssc ls' to see configured games, or 'ssc ls <title>' for a game's backups.")
    } else if error.is_user_input() {
        Some("Run 'ssc help <command>' for the accepted arguments.")
    } else {
        None
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(message) = e.downcast_ref::<ScummerError>().and_then(hint) {
                eprintln!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}
