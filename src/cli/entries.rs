use chrono::NaiveDate;
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;

use crate::aggregator::aggregate;
use crate::cli::open_db;
use crate::db;
use crate::error::{Result, TallyError};
use crate::fmt::{date, money};
use crate::models::{Status, Transaction, TransactionKind};
use crate::settings::load_settings;

fn parse_amount(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse()
        .map_err(|_| TallyError::InvalidTransaction(format!("bad amount '{raw}'")))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TallyError::InvalidTransaction(format!("bad date '{raw}' (expected YYYY-MM-DD)")))
}

pub fn add(
    description: &str,
    kind: &str,
    amount: &str,
    date_str: &str,
    status: &str,
    installments: Option<u32>,
) -> Result<()> {
    let settings = load_settings();
    let tx = Transaction::new(
        kind.parse::<TransactionKind>()?,
        description,
        parse_amount(amount)?,
        parse_date(date_str)?,
        status.parse::<Status>()?,
    )?
    .with_installments(installments)
    .with_owner(settings.owner());

    let conn = open_db(&settings)?;
    let id = db::insert_transaction(&conn, &tx, None)?;
    println!("Added #{id}: {} {}", tx.description, money(tx.amount));
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let snapshot = db::list_transactions(&conn, settings.owner())?;
    let rows = aggregate(&snapshot, None)?.filtered;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Kind", "Amount", "Status", "Months"]);
    for tx in &rows {
        table.add_row(vec![
            Cell::new(tx.id.map(|i| i.to_string()).unwrap_or_default()),
            Cell::new(date(tx.date)),
            Cell::new(&tx.description),
            Cell::new(tx.kind.label()),
            Cell::new(money(tx.amount)).set_alignment(CellAlignment::Right),
            Cell::new(tx.status.label()),
            Cell::new(tx.installments.map(|n| n.to_string()).unwrap_or_default()),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    id: i64,
    description: Option<String>,
    kind: Option<String>,
    amount: Option<String>,
    date_str: Option<String>,
    status: Option<String>,
    installments: Option<u32>,
) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let mut tx = db::get_transaction(&conn, id, settings.owner())?;

    if let Some(d) = description {
        tx.description = d.trim().to_string();
    }
    if let Some(k) = kind {
        tx.kind = k.parse()?;
    }
    if let Some(a) = amount {
        tx.amount = parse_amount(&a)?;
    }
    if let Some(d) = date_str {
        tx.date = parse_date(&d)?;
    }
    if let Some(s) = status {
        tx.status = s.parse()?;
    }
    if installments.is_some() {
        tx.installments = installments;
    }

    db::update_transaction(&conn, id, &tx, settings.owner())?;
    println!("Updated #{id}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    db::delete_transaction(&conn, id, settings.owner())?;
    println!("Deleted #{id}");
    Ok(())
}
