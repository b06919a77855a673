use comfy_table::{Cell, Table};

use crate::categorizer::MANUAL_CONFIDENCE;
use crate::error::Result;
use crate::merchant;
use crate::transactions;

pub fn list() -> Result<()> {
    let (conn, household_id) = super::open()?;
    let merchants = merchant::list(&conn, household_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Key", "Display Name", "Default Category", "Confidence"]);
    for m in &merchants {
        let category_name: String = match m.default_category_id {
            Some(id) => conn
                .query_row("SELECT name FROM categories WHERE id = ?1", [id], |r| r.get(0))
                .unwrap_or_else(|_| "?".to_string()),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(m.id),
            Cell::new(&m.merchant_key),
            Cell::new(&m.display_name),
            Cell::new(category_name),
            Cell::new(m.confidence.map(|c| format!("{c:.2}")).unwrap_or_default()),
        ]);
    }
    println!("{} merchants\n{table}", merchants.len());
    Ok(())
}

pub fn set_category(id: i64, category: &str) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let category_id = super::resolve_category(&conn, household_id, category)?;
    let m = merchant::set_default_category(&conn, household_id, id, category_id, MANUAL_CONFIDENCE)?;
    println!("{} now defaults to category {category}", m.display_name);
    Ok(())
}

pub fn recategorize(id: i64, all: bool) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let updated = transactions::recategorize_merchant(&conn, household_id, id, !all)?;
    println!("{updated} transactions recategorized");
    Ok(())
}
