use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

const HEADER: [&str; 12] = [
    "id",
    "date",
    "description",
    "amount",
    "status",
    "type",
    "running_balance",
    "category",
    "confidence",
    "account",
    "account_type",
    "account_last_four",
];

/// Write every transaction, joined with its account, to a CSV file.
/// Returns the number of rows written.
pub fn export_transactions(conn: &Connection, output: &Path) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.amount, t.status, t.type, \
                t.running_balance, t.inferred_category, t.confidence, \
                a.display_name, a.account_type, a.last_four \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         ORDER BY t.date DESC, t.id",
    )?;

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(HEADER)?;

    let mut rows = stmt.query([])?;
    let mut written = 0usize;
    while let Some(row) = rows.next()? {
        let running_balance: Option<f64> = row.get(6)?;
        let category: Option<String> = row.get(7)?;
        let confidence: Option<f64> = row.get(8)?;
        writer.write_record([
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?.to_string(),
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            running_balance.map(|b| b.to_string()).unwrap_or_default(),
            category.unwrap_or_default(),
            confidence.map(|c| c.to_string()).unwrap_or_default(),
            row.get::<_, String>(9)?,
            row.get::<_, String>(10)?,
            row.get::<_, String>(11)?,
        ])?;
        written += 1;
    }
    writer.flush()?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::test_support::{raw_account, raw_transaction};
    use crate::resolver::resolve_account;
    use crate::store::{apply_category, save_transaction};

    #[test]
    fn test_export_writes_joined_rows() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();

        let account =
            resolve_account(&conn, &raw_account("acc_r1", "chase", "checking", "1234")).unwrap();
        save_transaction(&conn, &raw_transaction("t1", "acc_r1", "2024-01-15", -25.5), account)
            .unwrap();
        save_transaction(&conn, &raw_transaction("t2", "acc_r1", "2024-01-16", -8.0), account)
            .unwrap();
        apply_category(&conn, "t1", "dining", 0.9).unwrap();

        let out = dir.path().join("out.csv");
        let written = export_transactions(&conn, &out).unwrap();
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            HEADER.to_vec()
        );
        let records: Vec<csv::StringRecord> =
            reader.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        // Newest first.
        assert_eq!(&records[0][0], "t2");
        assert_eq!(&records[0][7], "", "uncategorized exports an empty category");
        assert_eq!(&records[1][0], "t1");
        assert_eq!(&records[1][7], "dining");
        assert_eq!(&records[1][9], "chase checking");
    }

    #[test]
    fn test_export_empty_database_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();

        let out = dir.path().join("out.csv");
        assert_eq!(export_transactions(&conn, &out).unwrap(), 0);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        assert_eq!(reader.records().count(), 0);
    }
}
