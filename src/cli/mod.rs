pub mod dashboard;
pub mod entries;
#[cfg(feature = "pdf")]
pub mod export;
pub mod import;
pub mod init;
pub mod report;
pub mod status;

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::query::QuerySpec;
use crate::settings::Settings;

/// Open the configured database, creating the data directory and schema on first use.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "tally", about = "Personal income and expense ledger.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Report filters, as given on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Period: monthly or annual
    #[arg(long)]
    pub period: Option<String>,
    /// Kind: income, fixed_expense, variable_expense or all
    #[arg(long)]
    pub kind: Option<String>,
    /// Status: paid, pending or all
    #[arg(long)]
    pub status: Option<String>,
    /// Anchor month: YYYY-MM
    #[arg(long)]
    pub date: Option<String>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> Result<QuerySpec> {
        QuerySpec::parse(
            self.period.as_deref(),
            self.kind.as_deref(),
            self.status.as_deref(),
            self.date.as_deref(),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up tally: choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Owner name recorded on new transactions
        #[arg(long)]
        user: Option<String>,
    },
    /// Record an income or expense.
    Add {
        /// What the entry is for
        description: String,
        /// income, fixed_expense or variable_expense
        #[arg(long)]
        kind: String,
        /// Non-negative amount, e.g. 1234.56
        #[arg(long)]
        amount: String,
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// paid or pending
        #[arg(long, default_value = "pending")]
        status: String,
        /// Number of monthly installments
        #[arg(long)]
        installments: Option<u32>,
    },
    /// List transactions, newest first.
    List,
    /// Change fields of an existing transaction.
    Update {
        /// Transaction ID (shown in `tally list`)
        id: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        installments: Option<u32>,
    },
    /// Delete a transaction by ID.
    Delete {
        /// Transaction ID (shown in `tally list`)
        id: i64,
    },
    /// Import transactions from a CSV or JSON file.
    Import {
        /// Path to the file
        file: String,
        /// Format key: csv or json (default: from the file extension)
        #[arg(long)]
        format: Option<String>,
    },
    /// Totals over every transaction.
    Dashboard {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Filtered report with summary.
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of the text layout
        #[arg(long)]
        json: bool,
    },
    /// Export a filtered report to PDF.
    #[cfg(feature = "pdf")]
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// Show settings and database statistics.
    Status,
}
