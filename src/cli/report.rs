use crate::aggregator::aggregate;
use crate::cli::{open_db, FilterArgs};
use crate::db::list_transactions;
use crate::error::Result;
use crate::layout::{render, render_text, RenderOptions};
use crate::settings::load_settings;

pub fn run(filter: &FilterArgs, json: bool) -> Result<()> {
    // Reject bad filters before touching the database.
    let spec = filter.to_spec()?;
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let snapshot = list_transactions(&conn, settings.owner())?;
    let agg = aggregate(&snapshot, Some(&spec))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&agg)?);
        return Ok(());
    }

    let options = RenderOptions {
        title: settings.report_title.clone(),
        ..RenderOptions::default()
    };
    let doc = render(&agg.filtered, &agg.summary, &spec, &options)?;
    tracing::debug!(pages = doc.pages.len(), rows = doc.row_count(), "rendered report");
    print!("{}", render_text(&doc));
    Ok(())
}
