use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::aggregator::aggregate;
use crate::cli::open_db;
use crate::db::list_transactions;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;

pub fn run(json: bool) -> Result<()> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let snapshot = list_transactions(&conn, settings.owner())?;
    let summary = aggregate(&snapshot, None)?.summary;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Amount", "Count"]);
    let amount = |v| Cell::new(money(v)).set_alignment(CellAlignment::Right);
    let count = |n: usize| Cell::new(n).set_alignment(CellAlignment::Right);
    table.add_row(vec![Cell::new("Income"), amount(summary.total_income), Cell::new("")]);
    table.add_row(vec![
        Cell::new("Expenses"),
        amount(summary.total_expense),
        count(summary.fixed_expense_count + summary.variable_expense_count),
    ]);
    table.add_row(vec![
        Cell::new("  Fixed"),
        amount(summary.fixed_expense_total),
        count(summary.fixed_expense_count),
    ]);
    table.add_row(vec![
        Cell::new("  Variable"),
        amount(summary.variable_expense_total),
        count(summary.variable_expense_count),
    ]);
    table.add_row(vec![Cell::new("  Paid"), Cell::new(""), count(summary.paid_expense_count)]);
    table.add_row(vec![Cell::new("  Pending"), Cell::new(""), count(summary.pending_expense_count)]);

    let balance = summary.balance();
    let label = if balance.is_sign_negative() && !balance.is_zero() {
        "BALANCE".red().bold()
    } else {
        "BALANCE".green().bold()
    };
    table.add_row(vec![Cell::new(label), amount(balance), Cell::new("")]);

    println!("Dashboard\n{table}");
    Ok(())
}
