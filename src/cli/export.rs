use std::path::PathBuf;

use chrono::Local;

use crate::config::load_config;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::export::export_transactions;

pub fn run(output: Option<String>) -> Result<()> {
    let config = load_config();
    let conn = get_connection(&config.db_path())?;
    init_db(&conn)?;

    let output = match output {
        Some(path) => PathBuf::from(path),
        None => {
            let exports_dir = config.exports_dir();
            std::fs::create_dir_all(&exports_dir)?;
            exports_dir.join(format!(
                "transactions-{}.csv",
                Local::now().format("%Y-%m-%d")
            ))
        }
    };

    let written = export_transactions(&conn, &output)?;
    if written == 0 {
        println!("No transactions found to export.");
    } else {
        println!("Exported {written} transactions to {}", output.display());
    }
    Ok(())
}
