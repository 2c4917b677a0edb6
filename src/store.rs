use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::{FernError, Result};
use crate::models::{Account, RawTransaction, TransactionView};

/// Which rows a category operation touches.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    All,
    Account(i64),
}

/// Insert a fetched transaction, keyed on its remote id. Returns true when a
/// new row was written, false when a row with that id already existed. An
/// existing row is never mutated by this call.
pub fn save_transaction(conn: &Connection, txn: &RawTransaction, account_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO transactions \
         (id, account_id, amount, date, description, status, type, running_balance) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            txn.id,
            account_id,
            txn.amount,
            txn.date.to_string(),
            txn.description,
            txn.status,
            txn.txn_type,
            txn.running_balance,
        ],
    )?;
    Ok(inserted == 1)
}

/// Stored `(earliest, latest)` transaction dates for an account, or None for
/// an account with no transactions.
pub fn get_date_range(conn: &Connection, account_id: i64) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let (min, max): (Option<String>, Option<String>) = conn.query_row(
        "SELECT min(date), max(date) FROM transactions WHERE account_id = ?1",
        [account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    match (min, max) {
        (Some(min), Some(max)) => {
            let earliest = min
                .parse()
                .map_err(|e| FernError::Other(format!("bad date in store: {e}")))?;
            let latest = max
                .parse()
                .map_err(|e| FernError::Other(format!("bad date in store: {e}")))?;
            Ok(Some((earliest, latest)))
        }
        _ => Ok(None),
    }
}

/// Transactions with no inferred category, joined with their account so the
/// categorization prompt sees account context. Newest first.
pub fn get_uncategorized(conn: &Connection, scope: Scope) -> Result<Vec<TransactionView>> {
    let sql = "SELECT t.id, t.date, t.description, t.amount, \
               a.display_name, a.account_type, a.last_four \
               FROM transactions t \
               JOIN accounts a ON t.account_id = a.id \
               WHERE t.inferred_category IS NULL";
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(TransactionView {
            id: row.get(0)?,
            date: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            account_name: row.get(4)?,
            account_type: row.get(5)?,
            account_last_four: row.get(6)?,
        })
    };

    let views = match scope {
        Scope::All => {
            let mut stmt = conn.prepare(&format!("{sql} ORDER BY t.date DESC, t.id"))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        Scope::Account(id) => {
            let mut stmt =
                conn.prepare(&format!("{sql} AND t.account_id = ?1 ORDER BY t.date DESC, t.id"))?;
            let rows = stmt.query_map([id], map_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(views)
}

/// Set the inferred category for one transaction. Absent ids are a no-op,
/// not an error.
pub fn apply_category(conn: &Connection, transaction_id: &str, category: &str, confidence: f64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE transactions SET inferred_category = ?1, confidence = ?2 WHERE id = ?3",
        rusqlite::params![category, confidence, transaction_id],
    )?;
    if updated == 0 {
        log::debug!("apply_category: no row with id {transaction_id}");
    }
    Ok(())
}

/// Null out inferred categories and confidences in scope. Returns the number
/// of rows cleared.
pub fn clear_categories(conn: &Connection, scope: Scope) -> Result<usize> {
    let cleared = match scope {
        Scope::All => conn.execute(
            "UPDATE transactions SET inferred_category = NULL, confidence = NULL",
            [],
        )?,
        Scope::Account(id) => conn.execute(
            "UPDATE transactions SET inferred_category = NULL, confidence = NULL WHERE account_id = ?1",
            [id],
        )?,
    };
    Ok(cleared)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, fingerprint, institution_id, account_type, last_four, display_name \
         FROM accounts ORDER BY id",
    )?;
    let accounts = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                fingerprint: row.get(1)?,
                institution_id: row.get(2)?,
                account_type: row.get(3)?,
                last_four: row.get(4)?,
                display_name: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}
