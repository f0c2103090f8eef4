mod aggregator;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod layout;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod query;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, user } => cli::init::run(data_dir, user),
        Commands::Add {
            description,
            kind,
            amount,
            date,
            status,
            installments,
        } => cli::entries::add(&description, &kind, &amount, &date, &status, installments),
        Commands::List => cli::entries::list(),
        Commands::Update {
            id,
            description,
            kind,
            amount,
            date,
            status,
            installments,
        } => cli::entries::update(id, description, kind, amount, date, status, installments),
        Commands::Delete { id } => cli::entries::delete(id),
        Commands::Import { file, format } => cli::import::run(&file, format.as_deref()),
        Commands::Dashboard { json } => cli::dashboard::run(json),
        Commands::Report { filter, json } => cli::report::run(&filter, json),
        #[cfg(feature = "pdf")]
        Commands::Export { filter, output } => cli::export::run(&filter, output).map(|_| ()),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
