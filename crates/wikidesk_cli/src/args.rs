use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wikidesk")]
#[command(about = "Maintenance tool for a wikidesk store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check core linkage
    Ping,

    /// Show entity counts
    Stats,

    /// Full-text search over pages
    Search {
        text: String,

        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Manage stored backups
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Snapshot the live store
    Create { name: String },

    /// List stored backups, newest first
    #[command(alias = "ls")]
    List,

    /// Write a stored backup as JSON
    Export {
        id: String,

        /// Output file; stdout when absent
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Store a JSON backup document
    Import {
        file: PathBuf,

        /// Restore the imported backup right away
        #[arg(long)]
        restore: bool,
    },

    /// Replace live data with a stored backup
    Restore { id: String },
}
