mod bank;
mod categorize;
mod claude;
mod cli;
mod config;
mod db;
mod error;
mod export;
mod gaps;
mod models;
mod resolver;
mod retry;
mod store;
mod sync;

use clap::Parser;

use cli::{AccountsCommands, Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Sync {
            full,
            from_date,
            batch_size,
            recategorize,
        } => cli::sync::run(full, from_date.as_deref(), batch_size, recategorize),
        Commands::Accounts { command } => match command {
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Export { output } => cli::export::run(output),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
