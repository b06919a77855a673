use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{HearthError, Result};
use crate::fmt;
use crate::reports::{monthly_summary, ReportFilter};

pub fn run(
    month: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    account: Option<&str>,
) -> Result<()> {
    let (conn, household_id) = super::open()?;

    let account_id = match account {
        Some(name) => Some(
            conn.query_row(
                "SELECT id FROM accounts WHERE household_id = ?1 AND name = ?2",
                rusqlite::params![household_id, name],
                |r| r.get::<_, i64>(0),
            )
            .map_err(|_| HearthError::UnknownAccount(name.to_string()))?,
        ),
        None => None,
    };
    let (from, to) = match month {
        Some(m) => (Some(m.to_string()), Some(m.to_string())),
        None => (from.map(String::from), to.map(String::from)),
    };
    let filter = ReportFilter { from, to, account_id };
    let rows = monthly_summary(&conn, household_id, &filter)?;

    if rows.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Category", "Txns", "Spent", "Income", "Net", "Budget", "Used"]);
    for row in &rows {
        let used = match row.budget_used_pct {
            Some(pct) if pct > 100.0 => format!("{pct:.0}%").red().to_string(),
            Some(pct) => format!("{pct:.0}%"),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(&row.month),
            Cell::new(&row.category_name),
            Cell::new(row.txn_count),
            Cell::new(fmt::money(-row.expense_cents)),
            Cell::new(if row.income_cents != 0 {
                fmt::money(row.income_cents)
            } else {
                String::new()
            }),
            Cell::new(fmt::money(row.net_cents)),
            Cell::new(row.budget_limit_cents.map(fmt::money).unwrap_or_default()),
            Cell::new(used),
        ]);
    }
    println!("{table}");
    Ok(())
}
