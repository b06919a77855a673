use comfy_table::{Cell, Table};

use crate::budgets;
use crate::error::{HearthError, Result};
use crate::fmt;
use crate::importer::parse_amount_cents;

pub fn set(month: &str, category: &str, limit: &str) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let category_id = super::resolve_category(&conn, household_id, category)?;
    let limit_cents = parse_amount_cents(limit)
        .ok_or_else(|| HearthError::Validation(format!("'{limit}' is not a dollar amount")))?;
    let budget = budgets::upsert(&conn, household_id, month, category_id, limit_cents)?;
    println!(
        "Budget for {category} in {}: {}",
        budget.month,
        fmt::money(budget.limit_cents)
    );
    Ok(())
}

pub fn list(month: Option<&str>) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let budgets = budgets::list(&conn, household_id, month)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Month", "Category", "Limit"]);
    for b in &budgets {
        let category_name: String = conn
            .query_row("SELECT name FROM categories WHERE id = ?1", [b.category_id], |r| r.get(0))
            .unwrap_or_else(|_| "?".to_string());
        table.add_row(vec![
            Cell::new(b.id),
            Cell::new(&b.month),
            Cell::new(category_name),
            Cell::new(fmt::money(b.limit_cents)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let b = budgets::delete(&conn, household_id, id)?;
    println!("Removed {} budget for {}", b.month, fmt::money(b.limit_cents));
    Ok(())
}
