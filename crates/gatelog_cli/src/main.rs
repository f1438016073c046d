//! Gatelog CLI
//!
//! Local administration tool for the gate security log.
//!
//! # Commands
//!
//! - `add` - Record a new entry at the gate
//! - `exit` - Stamp an exit on a record
//! - `delete` - Remove a record
//! - `active` / `list` / `range` / `search` - Queries
//! - `stats` - Today's counters
//! - `queue` - Inspect the pending sync queue
//! - `setting` - Read or write a settings value
//! - `report` - Render the daily HTML report
//!
//! Mutations are written to the local store and their sync operations
//! land in the persisted queue; delivery to the remote mirror is the
//! desktop application's job, not this tool's.

mod commands;

use clap::{Parser, Subcommand};
use gatelog_core::LogKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Gate security log command-line tools.
#[derive(Parser)]
#[command(name = "gatelog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory holding the SQLite store and the sync queue
    #[arg(global = true, short, long, default_value = "gatelog_data")]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new entry at the gate
    Add {
        /// Entry kind (vehicle, visitor)
        #[arg(value_parser = parse_kind)]
        kind: LogKind,

        /// License plate (vehicles)
        #[arg(long)]
        plate: Option<String>,

        /// Driver name (vehicles)
        #[arg(long)]
        driver: Option<String>,

        /// Visitor name
        #[arg(long)]
        name: Option<String>,

        /// Person or department being visited
        #[arg(long)]
        host: Option<String>,

        /// Category within the kind (supplier, staff, guest, ...)
        #[arg(long)]
        category: Option<String>,

        /// Gate or site location
        #[arg(long)]
        location: Option<String>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// Stamp an exit on a record
    Exit {
        /// Record id
        id: i64,

        /// Seal number recorded at exit
        #[arg(long)]
        seal: Option<String>,

        /// Note to attach with the exit
        #[arg(long)]
        note: Option<String>,
    },

    /// Remove a record
    Delete {
        /// Record id
        id: i64,
    },

    /// List records still on site
    Active,

    /// List all records, newest first
    List {
        /// Maximum number of rows
        #[arg(short, long, default_value_t = gatelog_core::DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// List records in an inclusive date range
    Range {
        /// First day (YYYY-MM-DD)
        from: String,

        /// Last day (YYYY-MM-DD)
        to: String,
    },

    /// Search across plate, name, host and driver
    Search {
        /// Substring to look for (case-insensitive)
        term: String,

        /// Maximum number of rows
        #[arg(short, long, default_value_t = gatelog_core::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },

    /// Show today's counters
    Stats,

    /// Inspect the pending sync queue
    Queue,

    /// Read or write a settings value
    Setting {
        #[command(subcommand)]
        action: SettingAction,
    },

    /// Render the daily HTML report
    Report {
        /// Day to report on (YYYY-MM-DD), default yesterday
        #[arg(long)]
        date: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum SettingAction {
    /// Print the stored JSON value
    Get {
        /// Settings key
        key: String,
    },

    /// Store a JSON value
    Set {
        /// Settings key
        key: String,

        /// JSON value to store
        value: String,
    },
}

fn parse_kind(s: &str) -> Result<LogKind, String> {
    LogKind::parse(s).ok_or_else(|| format!("unknown kind '{s}', expected vehicle or visitor"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Add {
            kind,
            plate,
            driver,
            name,
            host,
            category,
            location,
            note,
        } => {
            let new = gatelog_core::NewLog {
                plate,
                driver,
                name,
                host,
                sub_category: category,
                location,
                note,
                ..gatelog_core::NewLog::of_kind(kind)
            };
            commands::add::run(&commands::open(&cli.data_dir)?, new)?;
        }
        Commands::Exit { id, seal, note } => {
            commands::exit::run(&commands::open(&cli.data_dir)?, id, seal, note)?;
        }
        Commands::Delete { id } => {
            commands::delete::run(&commands::open(&cli.data_dir)?, id)?;
        }
        Commands::Active => {
            commands::list::run_active(&commands::open(&cli.data_dir)?)?;
        }
        Commands::List { limit } => {
            commands::list::run_all(&commands::open(&cli.data_dir)?, limit)?;
        }
        Commands::Range { from, to } => {
            commands::list::run_range(&commands::open(&cli.data_dir)?, &from, &to)?;
        }
        Commands::Search { term, limit } => {
            commands::list::run_search(&commands::open(&cli.data_dir)?, &term, limit)?;
        }
        Commands::Stats => {
            commands::stats::run(&commands::open(&cli.data_dir)?)?;
        }
        Commands::Queue => {
            commands::queue::run(&commands::open(&cli.data_dir)?)?;
        }
        Commands::Setting { action } => {
            let dispatcher = commands::open(&cli.data_dir)?;
            match action {
                SettingAction::Get { key } => commands::setting::run_get(&dispatcher, &key)?,
                SettingAction::Set { key, value } => {
                    commands::setting::run_set(&dispatcher, &key, &value)?
                }
            }
        }
        Commands::Report { date, out } => {
            commands::report::run(
                &commands::open(&cli.data_dir)?,
                date.as_deref(),
                out.as_deref(),
            )?;
        }
        Commands::Version => {
            println!("Gatelog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Gatelog Core v{}", gatelog_core::VERSION);
            println!("Gatelog Sync v{}", gatelog_sync::VERSION);
        }
    }

    Ok(())
}
