use std::path::{Path, PathBuf};

use crate::aggregator::aggregate;
use crate::cli::{open_db, FilterArgs};
use crate::db::list_transactions;
use crate::error::Result;
use crate::layout::RenderOptions;
use crate::query::QuerySpec;
use crate::settings::load_settings;

fn default_path(data_dir: &str, spec: &QuerySpec) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    Path::new(data_dir)
        .join("exports")
        .join(format!("report-{}-{date}.pdf", spec.slug()))
}

fn write_pdf(bytes: &[u8], path: &Path) -> Result<String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    let display = format!("{}", path.display());
    println!("Wrote {display}");
    Ok(display)
}

pub fn run(filter: &FilterArgs, output: Option<String>) -> Result<String> {
    let spec = filter.to_spec()?;
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let snapshot = list_transactions(&conn, settings.owner())?;
    let agg = aggregate(&snapshot, Some(&spec))?;

    let options = RenderOptions {
        title: settings.report_title.clone(),
        ..RenderOptions::default()
    };
    let bytes = crate::pdf::render_report(&agg.filtered, &agg.summary, &spec, &options)?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&settings.data_dir, &spec));
    tracing::info!(path = %path.display(), rows = agg.filtered.len(), "exporting report");
    write_pdf(&bytes, &path)
}
