use comfy_table::{Cell, Table};

use crate::config::load_config;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::store::list_accounts;

pub fn list() -> Result<()> {
    let config = load_config();
    let conn = get_connection(&config.db_path())?;
    init_db(&conn)?;

    let accounts = list_accounts(&conn)?;
    if accounts.is_empty() {
        println!("No accounts yet. Run `fern sync` to pull them from your bank.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Institution", "Type", "Last Four"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.display_name),
            Cell::new(account.institution_id),
            Cell::new(account.account_type),
            Cell::new(account.last_four),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
