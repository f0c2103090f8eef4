use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::import_file;
use crate::settings::load_settings;

pub fn run(file: &str, format: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let mut conn = open_db(&settings)?;
    let result = import_file(&mut conn, Path::new(file), format, settings.owner())?;

    if result.duplicate_file {
        println!("Already imported: {file}");
        return Ok(());
    }
    println!("Imported {} transactions ({} duplicates skipped)", result.imported, result.skipped);
    Ok(())
}
