use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::importer::import_file;

pub fn run(file: &str, account: &str, format: Option<&str>) -> Result<()> {
    let file_path = PathBuf::from(file);
    let (conn, household_id) = super::open()?;

    let result = import_file(&conn, household_id, &file_path, account, format)?;

    println!(
        "{} imported, {} skipped (duplicates)",
        result.imported, result.skipped
    );
    if !result.warnings.is_empty() {
        println!("{}", format!("{} warnings:", result.warnings.len()).yellow());
        for warning in &result.warnings {
            println!("  {warning}");
        }
    }

    let uncategorized: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE import_id = ?1 AND category_id IS NULL",
        [result.import_id],
        |r| r.get(0),
    )?;
    if uncategorized > 0 {
        println!("{uncategorized} new transactions need a category (`hearth tx list --uncategorized`).");
    }
    Ok(())
}
