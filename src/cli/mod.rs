pub mod categorize;
pub mod events;
pub mod ingest;
pub mod init;
pub mod report;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "guilder", about = "Bank-statement ingestion and deduplicated ledger.", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up guilder: choose a data directory and initialize the database.
    Init {
        /// Path for guilder data (default: ~/Documents/guilder)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Ingest statement documents (csv, xls, xlsx, pdf) from a directory.
    Ingest {
        /// Directory to scan (default: the configured statements dir)
        #[arg(long)]
        dir: Option<String>,
    },
    /// Apply the keyword table to uncategorized transactions.
    Categorize,
    /// Debit/credit totals per category over an inclusive date range.
    Spend {
        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },
    /// Show the parse-event audit trail.
    Events {
        /// Restrict to one document id
        #[arg(long)]
        document: Option<i64>,
    },
}
