//! makuo - command-line client for the makuosan file replication daemon.
//!
//! Connects to the daemon's control socket, issues one command, and prints
//! the daemon's response on stdout. Connection settings come from the
//! config file, `MAKUO_*` environment variables, and command-line flags,
//! in that order.

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use makuo::{Config, Session};

#[derive(Parser)]
#[command(name = "makuo", version)]
#[command(about = "Client for the makuosan file replication daemon")]
struct Cli {
    /// Path of the daemon's Unix control socket
    #[arg(short = 'S', long, global = true)]
    socket: Option<String>,

    /// Working base directory (default: ask the daemon)
    #[arg(short, long, global = true)]
    base_dir: Option<PathBuf>,

    /// Read deadline in seconds; 0 waits indefinitely
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Raise the daemon log level during the session
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replicate a file or directory to the member servers
    Send {
        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
        /// Report what would be transferred without doing it
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Restrict the operation to one member host
        #[arg(short, long)]
        target: Option<String>,
        /// Path to operate on (default: the whole base directory)
        path: Option<PathBuf>,
    },
    /// Remove files from members that no longer exist locally
    Sync {
        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
        /// Report what would be removed without doing it
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Restrict the operation to one member host
        #[arg(short, long)]
        target: Option<String>,
        /// Path to operate on (default: the whole base directory)
        path: Option<PathBuf>,
    },
    /// Replicate and delete in one pass
    Dsync {
        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
        /// Report what would change without doing it
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Restrict the operation to one member host
        #[arg(short, long)]
        target: Option<String>,
        /// Path to operate on (default: the whole base directory)
        path: Option<PathBuf>,
    },
    /// Compare checksums with the members without transferring
    Check {
        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
        /// Restrict the operation to one member host
        #[arg(short, long)]
        target: Option<String>,
        /// Path to operate on (default: the whole base directory)
        path: Option<PathBuf>,
    },
    /// Manage the daemon's exclusion patterns
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },
    /// Show daemon status
    Status,
}

#[derive(Subcommand)]
enum ExcludeAction {
    /// Add a pattern to the exclusion list
    Add { pattern: String },
    /// Remove a pattern from the exclusion list
    Del { pattern: String },
    /// List the exclusion patterns
    List,
    /// Clear the exclusion list
    Clear,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .format_timestamp_secs()
    .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(socket) = cli.socket {
        config.socket_path = PathBuf::from(shellexpand::tilde(&socket).into_owned());
    }
    if let Some(base_dir) = cli.base_dir {
        config.base_dir = Some(base_dir);
    }
    if let Some(timeout) = cli.timeout {
        config.read_timeout = timeout;
    }
    if cli.debug {
        config.debug = true;
    }

    let mut session =
        Session::connect(&config.socket_path, config.base_dir.clone(), config.debug)?;
    session.set_read_timeout(config.read_timeout_duration())?;

    let response = match cli.command {
        Commands::Send {
            recursive,
            dry_run,
            target,
            path,
        } => {
            let path = absolutize(path)?;
            session.send(path.as_deref(), recursive, dry_run, target.as_deref())?
        }
        Commands::Sync {
            recursive,
            dry_run,
            target,
            path,
        } => {
            let path = absolutize(path)?;
            session.sync(path.as_deref(), recursive, dry_run, target.as_deref())?
        }
        Commands::Dsync {
            recursive,
            dry_run,
            target,
            path,
        } => {
            let path = absolutize(path)?;
            session.dsync(path.as_deref(), recursive, dry_run, target.as_deref())?
        }
        Commands::Check {
            recursive,
            target,
            path,
        } => {
            let path = absolutize(path)?;
            session.check(path.as_deref(), recursive, target.as_deref())?
        }
        Commands::Exclude { action } => match action {
            ExcludeAction::Add { pattern } => session.exclude_add(&pattern)?,
            ExcludeAction::Del { pattern } => session.exclude_del(&pattern)?,
            ExcludeAction::List => session.exclude_list()?,
            ExcludeAction::Clear => session.exclude_clear()?,
        },
        Commands::Status => session.execute_command("status")?,
    };

    print!("{response}");
    Ok(())
}

/// Anchor a command-line path to the current directory so it can be
/// relativized against the session base.
fn absolutize(path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match path {
        Some(p) if p.is_absolute() => Ok(Some(p)),
        Some(p) => Ok(Some(env::current_dir()?.join(p))),
        None => Ok(None),
    }
}
