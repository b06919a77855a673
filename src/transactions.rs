//! Transaction mutations: single patch, merchant cascade, bulk updates.
//!
//! All mutations are household-scoped; a transaction id from another
//! household behaves exactly like a missing id.

use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::categorizer::MANUAL_CONFIDENCE;
use crate::error::{HearthError, Result};
use crate::merchant;
use crate::models::Transaction;

const TXN_COLS: &str = "t.id, t.account_id, t.import_id, t.posted_date, t.description, \
                        t.amount_cents, t.merchant_key, t.merchant_id, t.category_id, t.is_reviewed";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        import_id: row.get(2)?,
        posted_date: row.get(3)?,
        description: row.get(4)?,
        amount_cents: row.get(5)?,
        merchant_key: row.get(6)?,
        merchant_id: row.get(7)?,
        category_id: row.get(8)?,
        is_reviewed: row.get(9)?,
    })
}

pub fn get(conn: &Connection, household_id: i64, txn_id: i64) -> Result<Transaction> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {TXN_COLS} FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         WHERE t.id = ?1 AND a.household_id = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![txn_id, household_id])?;
    match rows.next()? {
        Some(row) => Ok(row_to_transaction(row)?),
        None => Err(HearthError::TransactionNotFound(txn_id)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub category_id: Option<i64>,
    pub is_reviewed: Option<bool>,
    /// Also record the category as the merchant's learned default and
    /// cascade it to the merchant's other uncategorized transactions.
    pub apply_to_merchant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkUpdateResult {
    pub updated_transactions: usize,
    pub updated_merchants: usize,
    pub skipped: usize,
}

fn check_category(conn: &Connection, household_id: i64, category_id: i64) -> Result<()> {
    let ok: bool = conn
        .prepare_cached("SELECT 1 FROM categories WHERE id = ?1 AND household_id = ?2")?
        .exists(rusqlite::params![category_id, household_id])?;
    if ok {
        Ok(())
    } else {
        Err(HearthError::CategoryNotFound(category_id))
    }
}

fn apply_patch_fields(
    conn: &Connection,
    txn_id: i64,
    category_id: Option<i64>,
    is_reviewed: Option<bool>,
) -> Result<()> {
    if let Some(category_id) = category_id {
        conn.execute(
            "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
            rusqlite::params![category_id, txn_id],
        )?;
    }
    if let Some(reviewed) = is_reviewed {
        conn.execute(
            "UPDATE transactions SET is_reviewed = ?1 WHERE id = ?2",
            rusqlite::params![reviewed, txn_id],
        )?;
    }
    Ok(())
}

/// Update one transaction's category and/or reviewed flag.
///
/// With `apply_to_merchant`, the category also becomes the merchant's
/// learned default and is cascaded to the merchant's other uncategorized
/// transactions, all inside one transaction: no window where the default is
/// updated but the cascade has not run.
pub fn patch(
    conn: &Connection,
    household_id: i64,
    txn_id: i64,
    update: &TransactionPatch,
) -> Result<Transaction> {
    let tx = conn.unchecked_transaction()?;
    let txn = get(conn, household_id, txn_id)?;
    if let Some(category_id) = update.category_id {
        check_category(conn, household_id, category_id)?;
    }
    apply_patch_fields(conn, txn.id, update.category_id, update.is_reviewed)?;

    if update.apply_to_merchant {
        if let (Some(category_id), Some(merchant_id)) = (update.category_id, txn.merchant_id) {
            merchant::set_default_category(conn, household_id, merchant_id, category_id, MANUAL_CONFIDENCE)?;
            recategorize_merchant(conn, household_id, merchant_id, true)?;
        }
    }

    tx.commit()?;
    get(conn, household_id, txn_id)
}

/// Reassign a merchant's transactions to its *current* default category.
///
/// Reads the default at call time, so callers composing "apply to merchant"
/// must set the default first. With `only_uncategorized`, rows that already
/// carry a category (a user's explicit prior choice included) are left
/// untouched. Returns the number of rows updated; re-running is a no-op in
/// effect since reapplying the same category changes nothing.
pub fn recategorize_merchant(
    conn: &Connection,
    household_id: i64,
    merchant_id: i64,
    only_uncategorized: bool,
) -> Result<usize> {
    let m = merchant::get(conn, household_id, merchant_id)?;
    let category_id = m.default_category_id.ok_or_else(|| {
        HearthError::Validation(format!(
            "Merchant '{}' has no default category to cascade",
            m.display_name
        ))
    })?;

    let scope = if only_uncategorized { " AND category_id IS NULL" } else { "" };
    let sql = format!(
        "UPDATE transactions SET category_id = ?1 \
         WHERE merchant_id = ?2{scope} \
         AND account_id IN (SELECT id FROM accounts WHERE household_id = ?3)"
    );
    let updated = conn.execute(&sql, rusqlite::params![category_id, merchant_id, household_id])?;
    Ok(updated)
}

/// Apply a category/reviewed change to a batch of transactions.
///
/// Partial success is the expected outcome: unknown ids (or ids from another
/// household) are counted as skipped, never fatal. With `apply_to_merchant`
/// and a category, each distinct merchant among the updated rows gets
/// `set_default_category` once.
pub fn bulk_update(
    conn: &Connection,
    household_id: i64,
    txn_ids: &[i64],
    update: &TransactionPatch,
) -> Result<BulkUpdateResult> {
    if let Some(category_id) = update.category_id {
        check_category(conn, household_id, category_id)?;
    }

    let tx = conn.unchecked_transaction()?;
    let mut updated_transactions = 0usize;
    let mut skipped = 0usize;
    let mut merchants: BTreeSet<i64> = BTreeSet::new();

    for &txn_id in txn_ids {
        let txn = match get(conn, household_id, txn_id) {
            Ok(txn) => txn,
            Err(HearthError::TransactionNotFound(_)) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        apply_patch_fields(conn, txn.id, update.category_id, update.is_reviewed)?;
        updated_transactions += 1;
        if let Some(merchant_id) = txn.merchant_id {
            merchants.insert(merchant_id);
        }
    }

    let mut updated_merchants = 0usize;
    if update.apply_to_merchant {
        if let Some(category_id) = update.category_id {
            for &merchant_id in &merchants {
                merchant::set_default_category(
                    conn,
                    household_id,
                    merchant_id,
                    category_id,
                    MANUAL_CONFIDENCE,
                )?;
                updated_merchants += 1;
            }
        }
    }

    tx.commit()?;
    Ok(BulkUpdateResult {
        updated_transactions,
        updated_merchants,
        skipped,
    })
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<i64>,
    pub month: Option<String>,
    pub category_id: Option<i64>,
    pub uncategorized: bool,
}

/// List a household's transactions, newest first.
pub fn list(
    conn: &Connection,
    household_id: i64,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>> {
    let mut clauses = vec!["a.household_id = ?1".to_string()];
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(household_id)];

    if let Some(account_id) = filter.account_id {
        params.push(Box::new(account_id));
        clauses.push(format!("t.account_id = ?{}", params.len()));
    }
    if let Some(month) = &filter.month {
        params.push(Box::new(crate::month::parse(month)?));
        clauses.push(format!("substr(t.posted_date, 1, 7) = ?{}", params.len()));
    }
    if let Some(category_id) = filter.category_id {
        params.push(Box::new(category_id));
        clauses.push(format!("t.category_id = ?{}", params.len()));
    }
    if filter.uncategorized {
        clauses.push("t.category_id IS NULL".to_string());
    }

    let sql = format!(
        "SELECT {TXN_COLS} FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         WHERE {} ORDER BY t.posted_date DESC, t.id DESC",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), |row| row_to_transaction(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
