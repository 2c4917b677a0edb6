use crate::config::load_config;
use crate::db::get_connection;
use crate::error::Result;
use crate::store::{get_uncategorized, Scope};

pub fn run() -> Result<()> {
    let config = load_config();
    let db_path = config.db_path();

    println!("Data dir:   {}", config.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Batch size: {}", config.batch_size);
    println!("Tokens:     {}", config.access_tokens.len());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {} KiB", size / 1024);

        let conn = get_connection(&db_path)?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let uncategorized = get_uncategorized(&conn, Scope::All)?.len();

        println!();
        println!("Accounts:       {accounts}");
        println!("Transactions:   {transactions}");
        println!("Uncategorized:  {uncategorized}");
    } else {
        println!();
        println!("Database not found. Run `fern init` to set up.");
    }

    Ok(())
}
