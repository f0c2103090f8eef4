use std::path::Path;

use chrono::{DateTime, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, TallyError};
use crate::models::{Status, Transaction, TransactionKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    s.trim().parse().ok()
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp as exported by the old server.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Amounts are compared as decimals, so `40.1` and `40.10` match.
fn is_duplicate_row(conn: &Connection, tx: &Transaction) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT amount FROM transactions WHERE date = ?1 AND description = ?2 \
         AND kind = ?3 AND owner IS ?4",
    )?;
    let amounts = stmt.query_map(
        rusqlite::params![
            tx.date.format("%Y-%m-%d").to_string(),
            tx.description,
            tx.kind.key(),
            tx.owner,
        ],
        |r| r.get::<_, String>(0),
    )?;
    for amount in amounts {
        if amount?.parse::<Decimal>().ok() == Some(tx.amount) {
            return Ok(true);
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One record as read from a file, before validation.
#[derive(Debug, Clone, Default)]
struct RawRecord {
    kind: String,
    installments: Option<String>,
    description: String,
    amount: String,
    date: String,
    status: String,
    owner: Option<String>,
}

impl RawRecord {
    fn into_transaction(self, configured_owner: Option<&str>) -> Result<Transaction> {
        let kind: TransactionKind = self.kind.parse()?;
        let status: Status = self.status.parse()?;
        let amount = parse_amount(&self.amount).ok_or_else(|| {
            TallyError::InvalidTransaction(format!("bad amount '{}'", self.amount))
        })?;
        let date = parse_date(&self.date)
            .ok_or_else(|| TallyError::InvalidTransaction(format!("bad date '{}'", self.date)))?;
        let installments = match self.installments.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(n) => Some(n.parse::<u32>().map_err(|_| {
                TallyError::InvalidTransaction(format!("bad installments '{n}'"))
            })?),
        };
        // The configured owner wins; a file's own column only fills in single-tenant mode.
        let owner = configured_owner.or(self.owner.as_deref().filter(|o| !o.is_empty()));
        Ok(Transaction::new(kind, &self.description, amount, date, status)?
            .with_installments(installments)
            .with_owner(owner))
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    kind: String,
    #[serde(default)]
    installments: Option<String>,
    description: String,
    amount: String,
    date: String,
    status: String,
    #[serde(default)]
    owner: Option<String>,
}

impl From<CsvRecord> for RawRecord {
    fn from(r: CsvRecord) -> Self {
        Self {
            kind: r.kind,
            installments: r.installments,
            description: r.description,
            amount: r.amount,
            date: r.date,
            status: r.status,
            owner: r.owner,
        }
    }
}

/// JSON records accept both the current field names and the old server's.
#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(alias = "tipo")]
    kind: String,
    #[serde(default, alias = "meses")]
    installments: Option<serde_json::Value>,
    #[serde(alias = "descricao")]
    description: String,
    #[serde(alias = "valor")]
    amount: serde_json::Value,
    #[serde(alias = "data")]
    date: String,
    #[serde(alias = "situacao")]
    status: String,
    #[serde(default)]
    owner: Option<String>,
}

fn value_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<JsonRecord> for RawRecord {
    fn from(r: JsonRecord) -> Self {
        Self {
            kind: r.kind,
            installments: r.installments.as_ref().and_then(value_text),
            description: r.description,
            amount: value_text(&r.amount).unwrap_or_default(),
            date: r.date,
            status: r.status,
            owner: r.owner,
        }
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        match self {
            Self::Csv => parse_csv(file_path),
            Self::Json => parse_json(file_path),
        }
    }
}

const ALL_FORMATS: &[ImportFormat] = &[ImportFormat::Csv, ImportFormat::Json];

pub fn get_by_key(key: &str) -> Option<ImportFormat> {
    ALL_FORMATS
        .iter()
        .find(|f| f.key().eq_ignore_ascii_case(key))
        .copied()
}

pub fn detect(file_path: &Path) -> Option<ImportFormat> {
    let ext = file_path.extension()?.to_str()?;
    get_by_key(ext)
}

fn parse_csv(file_path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.deserialize::<CsvRecord>() {
        rows.push(result?.into());
    }
    Ok(rows)
}

fn parse_json(file_path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(file_path)?;
    let records: Vec<JsonRecord> = serde_json::from_str(&content)?;
    Ok(records.into_iter().map(RawRecord::from).collect())
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Import every record of `file_path`, or none of them if any is invalid.
pub fn import_file(
    conn: &mut Connection,
    file_path: &Path,
    format_key: Option<&str>,
    owner: Option<&str>,
) -> Result<ImportResult> {
    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
        if stmt.exists([&checksum])? {
            tracing::info!(file = %file_path.display(), "file already imported");
            return Ok(ImportResult {
                imported: 0,
                skipped: 0,
                duplicate_file: true,
            });
        }
    }

    let format = match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| {
            TallyError::InvalidTransaction(format!("unknown import format '{key}'"))
        })?,
        None => detect(file_path).ok_or_else(|| {
            TallyError::InvalidTransaction(format!(
                "cannot tell the format of {}; pass --format csv or --format json",
                file_path.display()
            ))
        })?,
    };

    let mut parsed = Vec::new();
    for (i, raw) in format.parse(file_path)?.into_iter().enumerate() {
        let tx = raw.into_transaction(owner).map_err(|e| {
            TallyError::InvalidTransaction(format!("record {}: {e}", i + 1))
        })?;
        parsed.push(tx);
    }

    let db = conn.transaction()?;
    let dates: Vec<NaiveDate> = parsed.iter().map(|t| t.date).collect();
    db.execute(
        "INSERT INTO imports (filename, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            parsed.len() as i64,
            dates.iter().min().map(|d| d.format("%Y-%m-%d").to_string()),
            dates.iter().max().map(|d| d.format("%Y-%m-%d").to_string()),
            checksum,
        ],
    )?;
    let import_id = db.last_insert_rowid();

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for tx in &parsed {
        if is_duplicate_row(&db, tx)? {
            skipped += 1;
            continue;
        }
        crate::db::insert_transaction(&db, tx, Some(import_id))?;
        imported += 1;
    }
    db.commit()?;

    tracing::info!(
        file = %file_path.display(),
        format = format.key(),
        imported,
        skipped,
        "imported transactions"
    );
    Ok(ImportResult {
        imported,
        skipped,
        duplicate_file: false,
    })
}
