use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{Result, TallyError};
use crate::models::Transaction;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    installments INTEGER,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    owner TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_owner_date ON transactions (owner, date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const COLUMNS: &str = "id, kind, installments, description, amount, date, status, owner";

type RawRow = (
    i64,
    String,
    Option<i64>,
    String,
    String,
    String,
    String,
    Option<String>,
);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

/// Stored values go through the same checks as user input.
fn from_raw(raw: RawRow) -> Result<Transaction> {
    let (id, kind, installments, description, amount, date, status, owner) = raw;
    let bad = |what: &str, value: &str| {
        TallyError::InvalidTransaction(format!("stored transaction {id} has bad {what} '{value}'"))
    };
    let installments = match installments {
        Some(n) => Some(u32::try_from(n).map_err(|_| bad("installments", &n.to_string()))?),
        None => None,
    };
    let tx = Transaction {
        id: Some(id),
        kind: kind.parse()?,
        installments,
        description,
        amount: amount.parse::<Decimal>().map_err(|_| bad("amount", &amount))?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| bad("date", &date))?,
        status: status.parse()?,
        owner,
    };
    tx.validate()?;
    Ok(tx)
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

pub fn insert_transaction(conn: &Connection, tx: &Transaction, import_id: Option<i64>) -> Result<i64> {
    tx.validate()?;
    conn.execute(
        "INSERT INTO transactions (kind, installments, description, amount, date, status, owner, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            tx.kind.key(),
            tx.installments,
            tx.description,
            tx.amount.to_string(),
            tx.date.format("%Y-%m-%d").to_string(),
            tx.status.key(),
            tx.owner,
            import_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The owner's snapshot in insertion order. `None` means single-tenant: every row.
pub fn list_transactions(conn: &Connection, owner: Option<&str>) -> Result<Vec<Transaction>> {
    let raw: Vec<RawRow> = match owner {
        Some(owner) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM transactions WHERE owner = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([owner], read_raw)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM transactions ORDER BY id"))?;
            let rows = stmt.query_map([], read_raw)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    raw.into_iter().map(from_raw).collect()
}

pub fn get_transaction(conn: &Connection, id: i64, owner: Option<&str>) -> Result<Transaction> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM transactions WHERE id = ?1 AND (?2 IS NULL OR owner = ?2)"
            ),
            rusqlite::params![id, owner],
            read_raw,
        )
        .optional()?
        .ok_or(TallyError::NotFound(id))?;
    from_raw(raw)
}

pub fn update_transaction(conn: &Connection, id: i64, tx: &Transaction, owner: Option<&str>) -> Result<()> {
    tx.validate()?;
    let changed = conn.execute(
        "UPDATE transactions SET kind = ?1, installments = ?2, description = ?3, amount = ?4, \
         date = ?5, status = ?6 WHERE id = ?7 AND (?8 IS NULL OR owner = ?8)",
        rusqlite::params![
            tx.kind.key(),
            tx.installments,
            tx.description,
            tx.amount.to_string(),
            tx.date.format("%Y-%m-%d").to_string(),
            tx.status.key(),
            id,
            owner,
        ],
    )?;
    if changed == 0 {
        return Err(TallyError::NotFound(id));
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, id: i64, owner: Option<&str>) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND (?2 IS NULL OR owner = ?2)",
        rusqlite::params![id, owner],
    )?;
    if changed == 0 {
        return Err(TallyError::NotFound(id));
    }
    Ok(())
}

pub fn count_transactions(conn: &Connection, owner: Option<&str>) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM transactions WHERE (?1 IS NULL OR owner = ?1)",
        [owner],
        |r| r.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, TransactionKind};
    use rust_decimal_macros::dec;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample(desc: &str, owner: Option<&str>) -> Transaction {
        Transaction::new(
            TransactionKind::FixedExpense,
            desc,
            dec!(1234.56),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            Status::Pending,
        )
        .unwrap()
        .with_installments(Some(12))
        .with_owner(owner)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "imports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_insert_and_get_roundtrip_keeps_exact_amount() {
        let (_dir, conn) = test_db();
        let id = insert_transaction(&conn, &sample("Rent", None), None).unwrap();
        let tx = get_transaction(&conn, id, None).unwrap();
        assert_eq!(tx.id, Some(id));
        assert_eq!(tx.amount, dec!(1234.56));
        assert_eq!(tx.installments, Some(12));
        assert_eq!(tx.kind, TransactionKind::FixedExpense);
    }

    #[test]
    fn test_list_is_scoped_by_owner() {
        let (_dir, conn) = test_db();
        insert_transaction(&conn, &sample("A", Some("ana")), None).unwrap();
        insert_transaction(&conn, &sample("B", Some("bea")), None).unwrap();
        insert_transaction(&conn, &sample("C", Some("ana")), None).unwrap();
        let ana = list_transactions(&conn, Some("ana")).unwrap();
        let names: Vec<&str> = ana.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(list_transactions(&conn, None).unwrap().len(), 3);
        assert_eq!(count_transactions(&conn, Some("ana")).unwrap(), 2);
        assert_eq!(count_transactions(&conn, Some("bea")).unwrap(), 1);
        assert_eq!(count_transactions(&conn, None).unwrap(), 3);
    }

    #[test]
    fn test_update_and_delete() {
        let (_dir, conn) = test_db();
        let id = insert_transaction(&conn, &sample("Rent", None), None).unwrap();
        let mut tx = get_transaction(&conn, id, None).unwrap();
        tx.status = Status::Paid;
        tx.amount = dec!(1300);
        update_transaction(&conn, id, &tx, None).unwrap();
        let reread = get_transaction(&conn, id, None).unwrap();
        assert_eq!(reread.status, Status::Paid);
        assert_eq!(reread.amount, dec!(1300));

        delete_transaction(&conn, id, None).unwrap();
        assert!(matches!(get_transaction(&conn, id, None), Err(TallyError::NotFound(i)) if i == id));
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (_dir, conn) = test_db();
        let tx = sample("Rent", None);
        assert!(matches!(update_transaction(&conn, 99, &tx, None), Err(TallyError::NotFound(99))));
        assert!(matches!(delete_transaction(&conn, 99, None), Err(TallyError::NotFound(99))));
    }

    #[test]
    fn test_other_owner_cannot_touch_record() {
        let (_dir, conn) = test_db();
        let id = insert_transaction(&conn, &sample("Rent", Some("ana")), None).unwrap();
        assert!(matches!(delete_transaction(&conn, id, Some("bea")), Err(TallyError::NotFound(_))));
        assert!(get_transaction(&conn, id, Some("ana")).is_ok());
    }

    #[test]
    fn test_unknown_stored_kind_is_rejected() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO transactions (kind, description, amount, date, status) \
             VALUES ('despesa', 'Legacy', '10', '2024-01-01', 'pago')",
            [],
        )
        .unwrap();
        let result = list_transactions(&conn, None);
        assert!(matches!(result, Err(TallyError::InvalidTransaction(_))));
    }

    #[test]
    fn test_negative_amount_is_not_inserted() {
        let (_dir, conn) = test_db();
        let mut tx = sample("Refund", None);
        tx.amount = dec!(-5);
        assert!(insert_transaction(&conn, &tx, None).is_err());
        assert_eq!(count_transactions(&conn, None).unwrap(), 0);
    }
}
