use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Result, TallyError};
use crate::models::{Status, Transaction, TransactionKind};
use crate::query::QuerySpec;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub fixed_expense_count: usize,
    pub variable_expense_count: usize,
    pub paid_expense_count: usize,
    pub pending_expense_count: usize,
    pub fixed_expense_total: Decimal,
    pub variable_expense_total: Decimal,
}

impl Summary {
    pub fn balance(&self) -> Decimal {
        self.total_income - self.total_expense
    }
}

fn add(total: &mut Decimal, amount: Decimal) -> Result<()> {
    *total = total.checked_add(amount).ok_or_else(|| {
        TallyError::InvalidQuery(format!("total overflows the decimal range when adding {amount}"))
    })?;
    Ok(())
}

/// Single pass over `transactions`. Fails rather than wrapping when a total
/// leaves the `Decimal` range.
pub fn summarize(transactions: &[Transaction]) -> Result<Summary> {
    let mut s = Summary::default();
    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => add(&mut s.total_income, tx.amount)?,
            TransactionKind::FixedExpense => {
                s.fixed_expense_count += 1;
                add(&mut s.fixed_expense_total, tx.amount)?;
            }
            TransactionKind::VariableExpense => {
                s.variable_expense_count += 1;
                add(&mut s.variable_expense_total, tx.amount)?;
            }
        }
        if tx.kind.is_expense() {
            add(&mut s.total_expense, tx.amount)?;
            match tx.status {
                Status::Paid => s.paid_expense_count += 1,
                Status::Pending => s.pending_expense_count += 1,
            }
        }
    }
    Ok(s)
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub filtered: Vec<Transaction>,
    pub summary: Summary,
}

/// Newest first. `sort_by` is stable, so equal dates keep input order.
fn sort_newest_first(rows: &mut [Transaction]) {
    rows.sort_by(|a, b| b.date.cmp(&a.date));
}

pub fn filter(transactions: &[Transaction], spec: &QuerySpec) -> Result<Vec<Transaction>> {
    let range = spec.date_range()?;
    let mut rows: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| spec.kind.map_or(true, |k| tx.kind == k))
        .filter(|tx| spec.status.map_or(true, |s| tx.status == s))
        .filter(|tx| range.map_or(true, |(start, end)| start <= tx.date && tx.date <= end))
        .cloned()
        .collect();
    sort_newest_first(&mut rows);
    Ok(rows)
}

/// With a spec, filter and summarize the filtered set (report mode).
/// Without one, summarize the whole snapshot (dashboard mode).
pub fn aggregate(transactions: &[Transaction], spec: Option<&QuerySpec>) -> Result<Aggregate> {
    let agg = match spec {
        Some(spec) => {
            let filtered = filter(transactions, spec)?;
            let summary = summarize(&filtered)?;
            Aggregate { filtered, summary }
        }
        None => {
            let mut filtered = transactions.to_vec();
            sort_newest_first(&mut filtered);
            Aggregate {
                filtered,
                summary: summarize(transactions)?,
            }
        }
    };
    tracing::debug!(
        input = transactions.len(),
        retained = agg.filtered.len(),
        report_mode = spec.is_some(),
        "aggregated transactions"
    );
    Ok(agg)
}
