use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::error::Result;
use crate::month;

/// One (month, category) line of the monthly summary. Income and expense
/// are kept apart so a refund never hides spending in the same category.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub month: String,
    pub category_id: Option<i64>,
    pub category_name: String,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub net_cents: i64,
    pub txn_count: i64,
    pub budget_limit_cents: Option<i64>,
    pub budget_used_pct: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Inclusive `YYYY-MM` range bounds; either side may be open.
    pub from: Option<String>,
    pub to: Option<String>,
    pub account_id: Option<i64>,
}

fn used_pct(expense_cents: i64, limit_cents: i64) -> Option<f64> {
    if limit_cents <= 0 {
        return None;
    }
    Some(expense_cents.unsigned_abs() as f64 / limit_cents as f64 * 100.0)
}

/// Per-month, per-category totals with budget usage attached.
///
/// The output is sparse: a (month, category) pair appears only if it has
/// transactions, or an active budget (reported as zero activity so an unused
/// budget is still visible). Gap-filling for charts is the caller's problem.
/// Rows sort by month, then biggest spender first.
pub fn monthly_summary(
    conn: &Connection,
    household_id: i64,
    filter: &ReportFilter,
) -> Result<Vec<ReportRow>> {
    let from = match &filter.from {
        Some(raw) => Some(month::parse(raw)?),
        None => None,
    };
    let to = match &filter.to {
        Some(raw) => Some(month::parse(raw)?),
        None => None,
    };

    let mut clauses = vec!["a.household_id = ?1".to_string()];
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(household_id)];
    if let Some(from) = &from {
        params.push(Box::new(from.clone()));
        clauses.push(format!("substr(t.posted_date, 1, 7) >= ?{}", params.len()));
    }
    if let Some(to) = &to {
        params.push(Box::new(to.clone()));
        clauses.push(format!("substr(t.posted_date, 1, 7) <= ?{}", params.len()));
    }
    if let Some(account_id) = filter.account_id {
        params.push(Box::new(account_id));
        clauses.push(format!("t.account_id = ?{}", params.len()));
    }

    let sql = format!(
        "SELECT substr(t.posted_date, 1, 7) AS month, t.category_id, c.name, \
         SUM(CASE WHEN t.amount_cents > 0 THEN t.amount_cents ELSE 0 END), \
         SUM(CASE WHEN t.amount_cents < 0 THEN t.amount_cents ELSE 0 END), \
         SUM(t.amount_cents), COUNT(*) \
         FROM transactions t \
         JOIN accounts a ON a.id = t.account_id \
         LEFT JOIN categories c ON c.id = t.category_id \
         WHERE {} GROUP BY month, t.category_id",
        clauses.join(" AND ")
    );

    let mut rows: Vec<ReportRow> = Vec::new();
    {
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let iter = stmt.query_map(param_refs.as_slice(), |row| {
            let category_name: Option<String> = row.get(2)?;
            Ok(ReportRow {
                month: row.get(0)?,
                category_id: row.get(1)?,
                category_name: category_name.unwrap_or_else(|| "Uncategorized".to_string()),
                income_cents: row.get(3)?,
                expense_cents: row.get(4)?,
                net_cents: row.get(5)?,
                txn_count: row.get(6)?,
                budget_limit_cents: None,
                budget_used_pct: None,
            })
        })?;
        for row in iter {
            rows.push(row?);
        }
    }

    // Active budgets in the same month range, keyed by (month, category)
    let mut budgets: HashMap<(String, i64), i64> = HashMap::new();
    {
        let mut clauses = vec!["b.household_id = ?1".to_string(), "b.is_active = 1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(household_id)];
        if let Some(from) = &from {
            params.push(Box::new(from.clone()));
            clauses.push(format!("b.month >= ?{}", params.len()));
        }
        if let Some(to) = &to {
            params.push(Box::new(to.clone()));
            clauses.push(format!("b.month <= ?{}", params.len()));
        }
        let sql = format!(
            "SELECT b.month, b.category_id, b.limit_cents FROM budgets b WHERE {}",
            clauses.join(" AND ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let iter = stmt.query_map(param_refs.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;
        for entry in iter {
            let (m, cat, limit) = entry?;
            budgets.insert((m, cat), limit);
        }
    }

    for row in &mut rows {
        if let Some(cat) = row.category_id {
            if let Some(&limit) = budgets.get(&(row.month.clone(), cat)) {
                row.budget_limit_cents = Some(limit);
                row.budget_used_pct = used_pct(row.expense_cents, limit);
            }
        }
    }

    // Budgets with no activity yet still get a row
    let covered: HashSet<(String, i64)> = rows
        .iter()
        .filter_map(|r| r.category_id.map(|c| (r.month.clone(), c)))
        .collect();
    for ((m, cat), limit) in &budgets {
        if covered.contains(&(m.clone(), *cat)) {
            continue;
        }
        let name: String = conn
            .prepare_cached("SELECT name FROM categories WHERE id = ?1")?
            .query_row([cat], |row| row.get(0))
            .unwrap_or_else(|_| "Unknown".to_string());
        rows.push(ReportRow {
            month: m.clone(),
            category_id: Some(*cat),
            category_name: name,
            income_cents: 0,
            expense_cents: 0,
            net_cents: 0,
            txn_count: 0,
            budget_limit_cents: Some(*limit),
            budget_used_pct: used_pct(0, *limit),
        });
    }

    rows.sort_by(|a, b| {
        a.month
            .cmp(&b.month)
            .then(a.expense_cents.cmp(&b.expense_cents))
            .then(a.category_name.cmp(&b.category_name))
    });
    Ok(rows)
}

/// Summary for exactly one month, every account.
pub fn one_month(conn: &Connection, household_id: i64, m: &str) -> Result<Vec<ReportRow>> {
    monthly_summary(
        conn,
        household_id,
        &ReportFilter {
            from: Some(m.to_string()),
            to: Some(m.to_string()),
            account_id: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budgets;
    use crate::db::{create_household, get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let hh = create_household(&conn, "Home").unwrap();
        conn.execute(
            "INSERT INTO accounts (household_id, name, account_type) VALUES (?1, 'Checking', 'checking')",
            [hh],
        )
        .unwrap();
        let account_id = conn.last_insert_rowid();
        conn.execute("INSERT INTO imports (account_id, filename) VALUES (?1, 't')", [account_id])
            .unwrap();
        (dir, conn, hh, account_id)
    }

    fn category(conn: &Connection, hh: i64, name: &str) -> i64 {
        conn.query_row(
            "SELECT id FROM categories WHERE household_id = ?1 AND name = ?2",
            rusqlite::params![hh, name],
            |r| r.get(0),
        )
        .unwrap()
    }

    fn add_txn(conn: &Connection, account_id: i64, date: &str, cents: i64, category_id: Option<i64>) {
        let fp = format!("fp-{date}-{cents}-{}", conn.last_insert_rowid());
        conn.execute(
            "INSERT INTO transactions \
             (account_id, import_id, posted_date, description, amount_cents, fingerprint, category_id) \
             VALUES (?1, 1, ?2, 'row', ?3, ?4, ?5)",
            rusqlite::params![account_id, date, cents, fp, category_id],
        )
        .unwrap();
    }

    fn all(conn: &Connection, hh: i64) -> Vec<ReportRow> {
        monthly_summary(conn, hh, &ReportFilter::default()).unwrap()
    }

    #[test]
    fn test_groups_by_month_and_category() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        let dining = category(&conn, hh, "Dining");
        add_txn(&conn, acct, "2026-01-05", -8_000, Some(groceries));
        add_txn(&conn, acct, "2026-01-20", -4_000, Some(groceries));
        add_txn(&conn, acct, "2026-01-12", -2_500, Some(dining));
        add_txn(&conn, acct, "2026-02-03", -9_000, Some(groceries));

        let rows = all(&conn, hh);
        assert_eq!(rows.len(), 3);
        // Month asc, biggest spend first inside the month
        assert_eq!(rows[0].month, "2026-01");
        assert_eq!(rows[0].category_name, "Groceries");
        assert_eq!(rows[0].expense_cents, -12_000);
        assert_eq!(rows[0].txn_count, 2);
        assert_eq!(rows[1].category_name, "Dining");
        assert_eq!(rows[2].month, "2026-02");
    }

    #[test]
    fn test_income_expense_net_split() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        add_txn(&conn, acct, "2026-01-05", -8_000, Some(groceries));
        add_txn(&conn, acct, "2026-01-09", 1_500, Some(groceries)); // refund
        let rows = all(&conn, hh);
        assert_eq!(rows[0].expense_cents, -8_000);
        assert_eq!(rows[0].income_cents, 1_500);
        assert_eq!(rows[0].net_cents, -6_500);
    }

    #[test]
    fn test_budget_used_pct() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        budgets::upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        add_txn(&conn, acct, "2026-01-05", -50_000, Some(groceries));
        let rows = one_month(&conn, hh, "2026-01").unwrap();
        assert_eq!(rows[0].budget_limit_cents, Some(40_000));
        assert_eq!(rows[0].budget_used_pct, Some(125.0));
    }

    #[test]
    fn test_unbudgeted_category_has_no_pct() {
        let (_dir, conn, hh, acct) = test_db();
        let dining = category(&conn, hh, "Dining");
        add_txn(&conn, acct, "2026-01-05", -2_000, Some(dining));
        let rows = all(&conn, hh);
        assert_eq!(rows[0].budget_limit_cents, None);
        assert_eq!(rows[0].budget_used_pct, None);
    }

    #[test]
    fn test_unused_budget_appears_as_zero_row() {
        let (_dir, conn, hh, _acct) = test_db();
        let travel = category(&conn, hh, "Travel");
        budgets::upsert(&conn, hh, "2026-03", travel, 100_000).unwrap();
        let rows = all(&conn, hh);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month, "2026-03");
        assert_eq!(rows[0].expense_cents, 0);
        assert_eq!(rows[0].txn_count, 0);
        assert_eq!(rows[0].budget_used_pct, Some(0.0));
    }

    #[test]
    fn test_sparse_no_zero_filler_rows() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        add_txn(&conn, acct, "2026-01-05", -1_000, Some(groceries));
        // Only the one (month, category) pair with activity shows up,
        // not every seeded category
        let rows = all(&conn, hh);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_uncategorized_bucket() {
        let (_dir, conn, hh, acct) = test_db();
        add_txn(&conn, acct, "2026-01-05", -3_000, None);
        let rows = all(&conn, hh);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_id, None);
        assert_eq!(rows[0].category_name, "Uncategorized");
    }

    #[test]
    fn test_month_range_is_inclusive() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        add_txn(&conn, acct, "2025-12-20", -1_000, Some(groceries));
        add_txn(&conn, acct, "2026-01-05", -2_000, Some(groceries));
        add_txn(&conn, acct, "2026-02-05", -3_000, Some(groceries));
        add_txn(&conn, acct, "2026-03-05", -4_000, Some(groceries));

        let filter = ReportFilter {
            from: Some("2026-01".to_string()),
            to: Some("2026-02".to_string()),
            account_id: None,
        };
        let rows = monthly_summary(&conn, hh, &filter).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "2026-01");
        assert_eq!(rows[1].month, "2026-02");
        assert!(monthly_summary(
            &conn,
            hh,
            &ReportFilter { from: Some("nope".to_string()), ..Default::default() }
        )
        .is_err());
    }

    #[test]
    fn test_account_filter() {
        let (_dir, conn, hh, acct) = test_db();
        conn.execute(
            "INSERT INTO accounts (household_id, name, account_type) VALUES (?1, 'Card', 'credit_card')",
            [hh],
        )
        .unwrap();
        let card = conn.last_insert_rowid();
        let groceries = category(&conn, hh, "Groceries");
        add_txn(&conn, acct, "2026-01-05", -1_000, Some(groceries));
        add_txn(&conn, card, "2026-01-06", -9_000, Some(groceries));

        let filter = ReportFilter {
            account_id: Some(card),
            ..Default::default()
        };
        let rows = monthly_summary(&conn, hh, &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expense_cents, -9_000);
    }

    #[test]
    fn test_deleted_budget_not_reported() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        let b = budgets::upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        budgets::delete(&conn, hh, b.id).unwrap();
        add_txn(&conn, acct, "2026-01-05", -1_000, Some(groceries));
        let rows = all(&conn, hh);
        assert_eq!(rows[0].budget_limit_cents, None);
    }
}
