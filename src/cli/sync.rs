use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::bank::BankClient;
use crate::claude::ClaudeClient;
use crate::config::load_config;
use crate::db::{get_connection, init_db};
use crate::error::{FernError, Result};
use crate::retry::SystemClock;
use crate::sync::{SyncOptions, SyncReport, Syncer};

pub fn run(
    full: bool,
    from_date: Option<&str>,
    batch_size: Option<usize>,
    recategorize: bool,
) -> Result<()> {
    let config = load_config();
    config.validate_for_sync()?;

    let from_date = from_date.map(parse_from_date).transpose()?;
    let batch_size = batch_size.unwrap_or(config.batch_size);
    if batch_size == 0 {
        return Err(FernError::Config("--batch-size must be at least 1".to_string()));
    }

    std::fs::create_dir_all(PathBuf::from(&config.data_dir))?;
    let conn = get_connection(&config.db_path())?;
    init_db(&conn)?;

    let bank = BankClient::new(Path::new(&config.cert_path), Path::new(&config.key_path))?;
    let categorizer = ClaudeClient::new(
        config.claude_api_key.clone(),
        config.model.clone(),
        config.categories.clone(),
    );
    let clock = SystemClock;

    // Sync up to yesterday; today's data may still be incomplete.
    let yesterday = Local::now()
        .date_naive()
        .pred_opt()
        .ok_or_else(|| FernError::Other("calendar underflow".to_string()))?;

    let opts = SyncOptions { full, from_date, batch_size, recategorize };
    let syncer = Syncer::new(&conn, &bank, &categorizer, &clock, &config);
    let report = syncer.sync(&opts, yesterday)?;

    print_report(&report);
    Ok(())
}

fn parse_from_date(raw: &str) -> Result<NaiveDate> {
    let date: NaiveDate = raw
        .parse()
        .map_err(|_| FernError::Config(format!("invalid date '{raw}', expected YYYY-MM-DD")))?;
    if date > Local::now().date_naive() {
        return Err(FernError::Config(format!("--from {date} is in the future")));
    }
    Ok(date)
}

fn print_report(report: &SyncReport) {
    if report.accounts.is_empty() && report.invalid_tokens.is_empty() {
        println!("No accounts to sync.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Account", "Fetched", "New", "Duplicates", "Overridden", "Categorized", "Fallback",
        "Abandoned", "Status",
    ]);
    for account in &report.accounts {
        let status = match &account.error {
            Some(err) => Cell::new(format!("failed: {err}").red().to_string()),
            None => Cell::new("ok".green().to_string()),
        };
        table.add_row(vec![
            Cell::new(&account.display_name),
            Cell::new(account.fetched),
            Cell::new(account.inserted),
            Cell::new(account.duplicates),
            Cell::new(account.overridden),
            Cell::new(account.categorized),
            Cell::new(account.fallback),
            Cell::new(account.abandoned),
            status,
        ]);
    }
    println!("Sync results\n{table}");

    if !report.invalid_tokens.is_empty() {
        println!(
            "{} {} token(s) were rejected by the bank: {}. Re-authenticate to refresh them.",
            "!".yellow().bold(),
            report.invalid_tokens.len(),
            report.invalid_tokens.join(", ")
        );
    }
    println!(
        "{} token(s) synced, {} rejected",
        report.valid_tokens,
        report.invalid_tokens.len()
    );
}
