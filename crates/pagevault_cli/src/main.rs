//! PageVault CLI
//!
//! Command-line tools for PageVault page stores.
//!
//! # Commands
//!
//! - `list` - List the pages held by a store
//! - `show` - Print the text of a page, now or as of a past instant
//! - `history` - Print the session-grouped history of a page
//! - `update` - Record a new revision of a page
//! - `lock` / `encrypt` - Toggle the lock or the encryption of a page
//! - `prime` - Arm a page to self-destruct on its next read
//! - `erase` - Delete a page and its history
//! - `verify` - Check page logs for corruption

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PageVault command-line page store tools.
#[derive(Parser)]
#[command(name = "pagevault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the page store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the pages held by the store
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the text of a page
    Show {
        /// Page name
        page: String,

        /// Read mode (edit, view, raw, history)
        #[arg(short, long, default_value = "view")]
        mode: String,

        /// Show the revision at or before this nanosecond timestamp
        #[arg(short, long)]
        at: Option<i64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the history of a page grouped into editing sessions
    History {
        /// Page name
        page: String,

        /// Session gap in seconds (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,

        /// List every revision instead of sessions
        #[arg(short, long)]
        revisions: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Record a new revision of a page
    Update {
        /// Page name
        page: String,

        /// New text of the page
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the new text from this file (stdin if neither is given)
        #[arg(short = 'i', long)]
        file: Option<PathBuf>,
    },

    /// Lock or unlock a page
    Lock {
        /// Page name
        page: String,

        /// Passphrase guarding the lock
        #[arg(short = 'k', long)]
        passphrase: String,
    },

    /// Encrypt or decrypt a page
    Encrypt {
        /// Page name
        page: String,

        /// Passphrase the text is encrypted with
        #[arg(short = 'k', long)]
        passphrase: String,
    },

    /// Arm a page to self-destruct on its next read
    Prime {
        /// Page name
        page: String,
    },

    /// Delete a page and its whole history
    Erase {
        /// Page name
        page: String,
    },

    /// Verify page logs
    Verify {
        /// Only verify this page
        page: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List { format } => {
            let path = cli.path.ok_or("Store path required for list")?;
            commands::list::run(&path, &format)?;
        }
        Commands::Show {
            page,
            mode,
            at,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for show")?;
            commands::show::run(&path, &page, &mode, at, &format)?;
        }
        Commands::History {
            page,
            interval,
            revisions,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for history")?;
            commands::history::run(&path, &page, interval, revisions, &format)?;
        }
        Commands::Update { page, text, file } => {
            let path = cli.path.ok_or("Store path required for update")?;
            commands::update::run(&path, &page, text, file.as_deref())?;
        }
        Commands::Lock { page, passphrase } => {
            let path = cli.path.ok_or("Store path required for lock")?;
            commands::lock::run(&path, &page, &passphrase)?;
        }
        Commands::Encrypt { page, passphrase } => {
            let path = cli.path.ok_or("Store path required for encrypt")?;
            commands::encrypt::run(&path, &page, &passphrase)?;
        }
        Commands::Prime { page } => {
            let path = cli.path.ok_or("Store path required for prime")?;
            commands::prime::run(&path, &page)?;
        }
        Commands::Erase { page } => {
            let path = cli.path.ok_or("Store path required for erase")?;
            commands::erase::run(&path, &page)?;
        }
        Commands::Verify { page, format } => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path, page.as_deref(), &format)?;
        }
        Commands::Version => {
            println!("PageVault CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("PageVault Core v{}", pagevault_core::VERSION);
        }
    }

    Ok(())
}
