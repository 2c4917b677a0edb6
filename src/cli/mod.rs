pub mod accounts;
pub mod export;
pub mod init;
pub mod status;
pub mod sync;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fern", about = "Sync bank transactions and categorize them with AI.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up fern: choose a data directory and initialize the database.
    Init {
        /// Path for fern data (default: ~/Documents/fern)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Fetch new transactions from the bank and categorize them.
    Sync {
        /// Re-fetch the whole window instead of filling gaps
        #[arg(long)]
        full: bool,
        /// Window start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// Transactions per categorization request
        #[arg(long = "batch-size")]
        batch_size: Option<usize>,
        /// Clear existing AI categories before categorizing
        #[arg(long)]
        recategorize: bool,
    },
    /// Manage synced accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Export all transactions to CSV.
    Export {
        /// Output file path (default: <data_dir>/exports/transactions-YYYY-MM-DD.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List all synced accounts.
    List,
}
