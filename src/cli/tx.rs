use comfy_table::{Cell, Table};

use crate::error::{HearthError, Result};
use crate::fmt;
use crate::transactions::{self, TransactionFilter, TransactionPatch};

pub fn list(
    account: Option<&str>,
    month: Option<&str>,
    category: Option<&str>,
    uncategorized: bool,
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
    let category_id = match category {
        Some(raw) => Some(super::resolve_category(&conn, household_id, raw)?),
        None => None,
    };

    let filter = TransactionFilter {
        account_id,
        month: month.map(|m| m.to_string()),
        category_id,
        uncategorized,
    };
    let txns = transactions::list(&conn, household_id, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Category", "Reviewed"]);
    for t in &txns {
        let category_name: String = match t.category_id {
            Some(id) => conn
                .query_row("SELECT name FROM categories WHERE id = ?1", [id], |r| r.get(0))
                .unwrap_or_else(|_| "?".to_string()),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.posted_date),
            Cell::new(&t.description),
            Cell::new(fmt::money(t.amount_cents)),
            Cell::new(category_name),
            Cell::new(if t.is_reviewed { "yes" } else { "" }),
        ]);
    }
    println!("{} transactions\n{table}", txns.len());
    Ok(())
}

pub fn set(
    id: i64,
    category: Option<&str>,
    reviewed: Option<bool>,
    apply_to_merchant: bool,
) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let category_id = match category {
        Some(raw) => Some(super::resolve_category(&conn, household_id, raw)?),
        None => None,
    };
    if category_id.is_none() && reviewed.is_none() {
        return Err(HearthError::Validation(
            "nothing to change: pass --category and/or --reviewed".to_string(),
        ));
    }
    let patch = TransactionPatch {
        category_id,
        is_reviewed: reviewed,
        apply_to_merchant,
    };
    let txn = transactions::patch(&conn, household_id, id, &patch)?;
    println!("Updated transaction {}: {}", txn.id, txn.description);
    if apply_to_merchant {
        println!("Merchant default updated; uncategorized siblings recategorized.");
    }
    Ok(())
}

pub fn bulk(
    ids: &[i64],
    category: Option<&str>,
    reviewed: Option<bool>,
    apply_to_merchant: bool,
) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let category_id = match category {
        Some(raw) => Some(super::resolve_category(&conn, household_id, raw)?),
        None => None,
    };
    if category_id.is_none() && reviewed.is_none() {
        return Err(HearthError::Validation(
            "nothing to change: pass --category and/or --reviewed".to_string(),
        ));
    }
    let patch = TransactionPatch {
        category_id,
        is_reviewed: reviewed,
        apply_to_merchant,
    };
    let result = transactions::bulk_update(&conn, household_id, ids, &patch)?;
    println!(
        "{} transactions updated, {} merchants updated, {} skipped",
        result.updated_transactions, result.updated_merchants, result.skipped
    );
    Ok(())
}
