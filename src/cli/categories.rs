use comfy_table::{Cell, Table};

use crate::categories;
use crate::error::Result;

pub fn list(all: bool) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let cats = categories::list(&conn, household_id, all)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Parent", "Active"]);
    for c in &cats {
        let parent: String = match c.parent_id {
            Some(id) => conn
                .query_row("SELECT name FROM categories WHERE id = ?1", [id], |r| r.get(0))
                .unwrap_or_else(|_| "?".to_string()),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(parent),
            Cell::new(if c.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn add(name: &str, parent: Option<&str>) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let parent_id = match parent {
        Some(raw) => Some(super::resolve_category(&conn, household_id, raw)?),
        None => None,
    };
    let cat = categories::add(&conn, household_id, name, parent_id)?;
    println!("Added category {} (id {})", cat.name, cat.id);
    Ok(())
}

pub fn mv(id: i64, parent: Option<&str>) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let parent_id = match parent {
        Some(raw) => Some(super::resolve_category(&conn, household_id, raw)?),
        None => None,
    };
    let cat = categories::set_parent(&conn, household_id, id, parent_id)?;
    match cat.parent_id {
        Some(pid) => println!("Moved {} under category {pid}", cat.name),
        None => println!("Moved {} to the top level", cat.name),
    }
    Ok(())
}

pub fn rename(id: i64, name: &str) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let cat = categories::rename(&conn, household_id, id, name)?;
    println!("Renamed category {} to {}", cat.id, cat.name);
    Ok(())
}

pub fn disable(id: i64) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let cat = categories::disable(&conn, household_id, id)?;
    println!("Disabled {}. Existing transactions keep it.", cat.name);
    Ok(())
}
