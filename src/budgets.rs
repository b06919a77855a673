use rusqlite::Connection;

use crate::error::{HearthError, Result};
use crate::models::Budget;
use crate::month;

fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        household_id: row.get(1)?,
        month: row.get(2)?,
        category_id: row.get(3)?,
        limit_cents: row.get(4)?,
    })
}

const BUDGET_COLS: &str = "id, household_id, month, category_id, limit_cents";

pub fn get(conn: &Connection, household_id: i64, budget_id: i64) -> Result<Budget> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {BUDGET_COLS} FROM budgets \
         WHERE id = ?1 AND household_id = ?2 AND is_active = 1"
    ))?;
    let mut rows = stmt.query(rusqlite::params![budget_id, household_id])?;
    match rows.next()? {
        Some(row) => Ok(row_to_budget(row)?),
        None => Err(HearthError::BudgetNotFound(budget_id)),
    }
}

/// Set the spending limit for (month, category). One budget per pair: setting
/// it again replaces the limit instead of stacking a second row. A previously
/// deleted budget for the pair is revived.
pub fn upsert(
    conn: &Connection,
    household_id: i64,
    month_raw: &str,
    category_id: i64,
    limit_cents: i64,
) -> Result<Budget> {
    let month = month::parse(month_raw)?;
    if limit_cents < 0 {
        return Err(HearthError::Validation(
            "budget limit cannot be negative".to_string(),
        ));
    }
    let category_ok: bool = conn
        .prepare_cached("SELECT 1 FROM categories WHERE id = ?1 AND household_id = ?2")?
        .exists(rusqlite::params![category_id, household_id])?;
    if !category_ok {
        return Err(HearthError::CategoryNotFound(category_id));
    }
    conn.execute(
        "INSERT INTO budgets (household_id, month, category_id, limit_cents, is_active) \
         VALUES (?1, ?2, ?3, ?4, 1) \
         ON CONFLICT(household_id, month, category_id) \
         DO UPDATE SET limit_cents = excluded.limit_cents, is_active = 1",
        rusqlite::params![household_id, month, category_id, limit_cents],
    )?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {BUDGET_COLS} FROM budgets \
         WHERE household_id = ?1 AND month = ?2 AND category_id = ?3"
    ))?;
    let mut rows = stmt.query(rusqlite::params![household_id, month, category_id])?;
    match rows.next()? {
        Some(row) => Ok(row_to_budget(row)?),
        None => Err(HearthError::Other("budget vanished after upsert".to_string())),
    }
}

/// Soft-delete; the row stays for history but stops counting in reports.
pub fn delete(conn: &Connection, household_id: i64, budget_id: i64) -> Result<Budget> {
    let budget = get(conn, household_id, budget_id)?;
    conn.execute(
        "UPDATE budgets SET is_active = 0 WHERE id = ?1 AND household_id = ?2",
        rusqlite::params![budget_id, household_id],
    )?;
    Ok(budget)
}

pub fn list(conn: &Connection, household_id: i64, month_filter: Option<&str>) -> Result<Vec<Budget>> {
    match month_filter {
        Some(raw) => {
            let m = month::parse(raw)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUDGET_COLS} FROM budgets \
                 WHERE household_id = ?1 AND month = ?2 AND is_active = 1 \
                 ORDER BY month, category_id"
            ))?;
            let rows = stmt.query_map(rusqlite::params![household_id, m], |row| row_to_budget(row))?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUDGET_COLS} FROM budgets \
                 WHERE household_id = ?1 AND is_active = 1 \
                 ORDER BY month, category_id"
            ))?;
            let rows = stmt.query_map([household_id], |row| row_to_budget(row))?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_household, get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let hh = create_household(&conn, "Home").unwrap();
        let groceries: i64 = conn
            .query_row(
                "SELECT id FROM categories WHERE household_id = ?1 AND name = 'Groceries'",
                [hh],
                |r| r.get(0),
            )
            .unwrap();
        (dir, conn, hh, groceries)
    }

    #[test]
    fn test_upsert_creates_then_replaces() {
        let (_dir, conn, hh, groceries) = test_db();
        let b1 = upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        assert_eq!(b1.limit_cents, 40_000);
        let b2 = upsert(&conn, hh, "2026-01", groceries, 55_000).unwrap();
        assert_eq!(b2.id, b1.id);
        assert_eq!(b2.limit_cents, 55_000);
        assert_eq!(list(&conn, hh, None).unwrap().len(), 1);
    }

    #[test]
    fn test_negative_limit_rejected() {
        let (_dir, conn, hh, groceries) = test_db();
        let err = upsert(&conn, hh, "2026-01", groceries, -1);
        assert!(matches!(err, Err(HearthError::Validation(_))));
    }

    #[test]
    fn test_zero_limit_allowed() {
        let (_dir, conn, hh, groceries) = test_db();
        let b = upsert(&conn, hh, "2026-01", groceries, 0).unwrap();
        assert_eq!(b.limit_cents, 0);
    }

    #[test]
    fn test_bad_month_rejected() {
        let (_dir, conn, hh, groceries) = test_db();
        assert!(upsert(&conn, hh, "January", groceries, 100).is_err());
        assert!(upsert(&conn, hh, "2026-13", groceries, 100).is_err());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let (_dir, conn, hh, _groceries) = test_db();
        let err = upsert(&conn, hh, "2026-01", 9999, 100);
        assert!(matches!(err, Err(HearthError::CategoryNotFound(9999))));
    }

    #[test]
    fn test_delete_is_soft_and_upsert_revives() {
        let (_dir, conn, hh, groceries) = test_db();
        let b = upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        let deleted = delete(&conn, hh, b.id).unwrap();
        assert_eq!(deleted.id, b.id);
        assert!(list(&conn, hh, None).unwrap().is_empty());
        assert!(matches!(get(&conn, hh, b.id), Err(HearthError::BudgetNotFound(_))));
        // Setting the same pair again reuses the row
        let revived = upsert(&conn, hh, "2026-01", groceries, 20_000).unwrap();
        assert_eq!(revived.id, b.id);
        assert_eq!(list(&conn, hh, None).unwrap().len(), 1);
    }

    #[test]
    fn test_list_month_filter() {
        let (_dir, conn, hh, groceries) = test_db();
        upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        upsert(&conn, hh, "2026-02", groceries, 41_000).unwrap();
        assert_eq!(list(&conn, hh, Some("2026-02")).unwrap().len(), 1);
        assert_eq!(list(&conn, hh, None).unwrap().len(), 2);
    }

    #[test]
    fn test_household_scoping() {
        let (_dir, conn, hh, groceries) = test_db();
        let other = create_household(&conn, "Other").unwrap();
        let b = upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        assert!(matches!(
            get(&conn, other, b.id),
            Err(HearthError::BudgetNotFound(_))
        ));
        assert!(list(&conn, other, None).unwrap().is_empty());
    }
}
