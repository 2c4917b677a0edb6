use rusqlite::{Connection, OptionalExtension};

use crate::error::{FernError, Result};
use crate::models::RawAccount;

/// Stable local identity for a raw account: `institution:type:last_four`.
/// Survives re-enrollment, which rotates the remote account id.
pub fn fingerprint(raw: &RawAccount) -> Result<String> {
    let institution = raw.institution.id.trim();
    let account_type = raw.account_type.trim();
    let last_four = raw.last_four.trim();

    if institution.is_empty() || account_type.is_empty() || last_four.is_empty() {
        return Err(FernError::AmbiguousIdentity(format!(
            "account '{}' is missing institution, type, or last four",
            raw.id
        )));
    }

    Ok(format!("{institution}:{account_type}:{last_four}"))
}

/// Return the local account id for a raw account, creating the row on first
/// sight of its fingerprint. Idempotent across re-authentications.
pub fn resolve_account(conn: &Connection, raw: &RawAccount) -> Result<i64> {
    let fp = fingerprint(raw)?;

    let existing: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE fingerprint = ?1", [&fp], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO accounts (fingerprint, institution_id, account_type, last_four, display_name) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            fp,
            raw.institution.id.trim(),
            raw.account_type.trim(),
            raw.last_four.trim(),
            raw.name,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::test_support::raw_account;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_resolve_creates_account_once() {
        let (_dir, conn) = test_db();
        let raw = raw_account("acc_remote_1", "chase", "checking", "1234");

        let first = resolve_account(&conn, &raw).unwrap();
        let second = resolve_account(&conn, &raw).unwrap();
        assert_eq!(first, second);

        let count: i64 = conn
            .query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reauthentication_keeps_identity() {
        let (_dir, conn) = test_db();
        let before = raw_account("acc_remote_1", "chase", "checking", "1234");
        let after = raw_account("acc_remote_99", "chase", "checking", "1234");

        let first = resolve_account(&conn, &before).unwrap();
        let second = resolve_account(&conn, &after).unwrap();
        assert_eq!(first, second, "fingerprint match must ignore the remote id");
    }

    #[test]
    fn test_distinct_fingerprints_get_distinct_accounts() {
        let (_dir, conn) = test_db();
        let checking = raw_account("r1", "chase", "checking", "1234");
        let savings = raw_account("r2", "chase", "savings", "1234");

        let a = resolve_account(&conn, &checking).unwrap();
        let b = resolve_account(&conn, &savings).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_component_is_ambiguous() {
        let (_dir, conn) = test_db();
        let mut raw = raw_account("r1", "chase", "checking", "1234");
        raw.last_four = "  ".to_string();

        let err = resolve_account(&conn, &raw).unwrap_err();
        assert!(matches!(err, crate::error::FernError::AmbiguousIdentity(_)));
    }

    #[test]
    fn test_fingerprint_format() {
        let raw = raw_account("r1", "chase", "checking", "1234");
        assert_eq!(fingerprint(&raw).unwrap(), "chase:checking:1234");
    }
}
