use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[serde(alias = "receita")]
    Income,
    #[serde(alias = "despesa_fixa")]
    FixedExpense,
    #[serde(alias = "despesa_variavel")]
    VariableExpense,
}

impl TransactionKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::FixedExpense => "fixed_expense",
            Self::VariableExpense => "variable_expense",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::FixedExpense => "Fixed expense",
            Self::VariableExpense => "Variable expense",
        }
    }

    /// Fixed and variable expenses form the expense family.
    pub fn is_expense(&self) -> bool {
        matches!(self, Self::FixedExpense | Self::VariableExpense)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TransactionKind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" => Ok(Self::Income),
            "fixed_expense" | "despesa_fixa" => Ok(Self::FixedExpense),
            "variable_expense" | "despesa_variavel" => Ok(Self::VariableExpense),
            other => Err(TallyError::InvalidTransaction(format!(
                "unknown kind '{other}' (expected income, fixed_expense or variable_expense)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[serde(alias = "pago")]
    Paid,
    #[serde(alias = "pendente")]
    Pending,
}

impl Status {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Status {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "paid" | "pago" => Ok(Self::Paid),
            "pending" | "pendente" => Ok(Self::Pending),
            other => Err(TallyError::InvalidTransaction(format!(
                "unknown status '{other}' (expected paid or pending)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Transaction {
    /// Build a record that has not been stored yet, enforcing the boundary rules.
    pub fn new(
        kind: TransactionKind,
        description: &str,
        amount: Decimal,
        date: NaiveDate,
        status: Status,
    ) -> Result<Self> {
        let tx = Self {
            id: None,
            kind,
            installments: None,
            description: description.trim().to_string(),
            amount,
            date,
            status,
            owner: None,
        };
        tx.validate()?;
        Ok(tx)
    }

    pub fn with_installments(mut self, installments: Option<u32>) -> Self {
        self.installments = installments;
        self
    }

    pub fn with_owner(mut self, owner: Option<&str>) -> Self {
        self.owner = owner.filter(|o| !o.is_empty()).map(str::to_string);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(TallyError::InvalidTransaction(format!(
                "amount must not be negative (got {})",
                self.amount
            )));
        }
        if self.description.trim().is_empty() {
            return Err(TallyError::InvalidTransaction(
                "description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_kind_parses_keys_and_legacy_labels() {
        assert_eq!("income".parse::<TransactionKind>().unwrap(), TransactionKind::Income);
        assert_eq!("despesa_fixa".parse::<TransactionKind>().unwrap(), TransactionKind::FixedExpense);
        assert_eq!(
            " Variable_Expense ".parse::<TransactionKind>().unwrap(),
            TransactionKind::VariableExpense
        );
    }

    #[test]
    fn test_kind_rejects_unknown_label() {
        let err = "despesa".parse::<TransactionKind>().unwrap_err();
        assert!(err.to_string().contains("unknown kind 'despesa'"), "got: {err}");
    }

    #[test]
    fn test_expense_family() {
        assert!(!TransactionKind::Income.is_expense());
        assert!(TransactionKind::FixedExpense.is_expense());
        assert!(TransactionKind::VariableExpense.is_expense());
    }

    #[test]
    fn test_status_parses_and_rejects() {
        assert_eq!("pago".parse::<Status>().unwrap(), Status::Paid);
        assert_eq!("PENDING".parse::<Status>().unwrap(), Status::Pending);
        assert!("overdue".parse::<Status>().is_err());
    }

    #[test]
    fn test_new_rejects_negative_amount() {
        let result = Transaction::new(
            TransactionKind::Income,
            "Salary",
            dec!(-1.00),
            day(2024, 1, 5),
            Status::Paid,
        );
        assert!(matches!(result, Err(TallyError::InvalidTransaction(_))));
    }

    #[test]
    fn test_new_rejects_blank_description() {
        let result = Transaction::new(
            TransactionKind::Income,
            "   ",
            dec!(1.00),
            day(2024, 1, 5),
            Status::Paid,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_accepts_zero_and_trims() {
        let tx = Transaction::new(
            TransactionKind::FixedExpense,
            "  Rent ",
            dec!(0),
            day(2024, 1, 5),
            Status::Pending,
        )
        .unwrap()
        .with_owner(Some(""));
        assert_eq!(tx.description, "Rent");
        assert_eq!(tx.owner, None);
    }

    #[test]
    fn test_deserializes_legacy_labels() {
        let json = r#"{"kind":"despesa_variavel","description":"Food","amount":"12.30","date":"2024-02-01","status":"pendente"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionKind::VariableExpense);
        assert_eq!(tx.status, Status::Pending);
        assert_eq!(tx.amount, dec!(12.30));
    }
}
