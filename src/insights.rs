use rusqlite::Connection;

use crate::error::Result;
use crate::fmt;
use crate::month;
use crate::reports;

/// Spikes smaller than this are noise, whatever the ratio says.
const SPIKE_MIN_DELTA_CENTS: i64 = 5_000;
const SPIKE_RATIO: f64 = 1.5;
/// Charges this close in amount count as "the same" recurring charge.
const SUBSCRIPTION_TOLERANCE: f64 = 0.10;
const SUBSCRIPTION_WINDOW_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
}

impl Severity {
    fn rank(&self) -> u8 {
        match self {
            Self::Warning => 0,
            Self::Info => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    Overspend,
    Spike,
    SubscriptionCandidate,
}

#[derive(Debug, Clone)]
pub struct Insight {
    pub severity: Severity,
    pub kind: InsightKind,
    pub message: String,
    /// Magnitude in cents, used only for ordering within a severity.
    pub amount_cents: i64,
}

/// Everything worth telling the user about one month, most urgent first.
pub fn generate(conn: &Connection, household_id: i64, month_raw: &str) -> Result<Vec<Insight>> {
    let m = month::parse(month_raw)?;
    let mut insights = Vec::new();
    insights.extend(overspend_insights(conn, household_id, &m)?);
    insights.extend(spike_insights(conn, household_id, &m)?);
    insights.extend(subscription_insights(conn, household_id, &m)?);
    insights.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then(b.amount_cents.cmp(&a.amount_cents))
    });
    Ok(insights)
}

fn spend_by_category(conn: &Connection, household_id: i64, m: &str) -> Result<Vec<(i64, String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.category_id, c.name, SUM(-t.amount_cents) \
         FROM transactions t \
         JOIN accounts a ON a.id = t.account_id \
         JOIN categories c ON c.id = t.category_id \
         WHERE a.household_id = ?1 AND substr(t.posted_date, 1, 7) = ?2 \
           AND t.amount_cents < 0 \
         GROUP BY t.category_id",
    )?;
    let rows = stmt.query_map(rusqlite::params![household_id, m], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn overspend_insights(conn: &Connection, household_id: i64, m: &str) -> Result<Vec<Insight>> {
    let mut out = Vec::new();
    for row in reports::one_month(conn, household_id, m)? {
        let (Some(limit), Some(pct)) = (row.budget_limit_cents, row.budget_used_pct) else {
            continue;
        };
        if pct <= 100.0 {
            continue;
        }
        let spent = -row.expense_cents;
        out.push(Insight {
            severity: Severity::Warning,
            kind: InsightKind::Overspend,
            message: format!(
                "{} is over budget: {} spent of {} ({pct:.0}%)",
                row.category_name,
                fmt::money(spent),
                fmt::money(limit),
            ),
            amount_cents: spent - limit,
        });
    }
    Ok(out)
}

/// A category spending notably above its own recent baseline. Needs at
/// least two prior months with activity so one-off first purchases in a
/// category do not alarm.
fn spike_insights(conn: &Connection, household_id: i64, m: &str) -> Result<Vec<Insight>> {
    let trailing = [month::prev(m), month::prev(&month::prev(m)), {
        let p2 = month::prev(&month::prev(m));
        month::prev(&p2)
    }];
    let mut out = Vec::new();
    for (category_id, name, spent) in spend_by_category(conn, household_id, m)? {
        let mut history = Vec::new();
        for t in &trailing {
            let prior: i64 = conn
                .prepare_cached(
                    "SELECT COALESCE(SUM(-t.amount_cents), 0) FROM transactions t \
                     JOIN accounts a ON a.id = t.account_id \
                     WHERE a.household_id = ?1 AND t.category_id = ?2 \
                       AND substr(t.posted_date, 1, 7) = ?3 AND t.amount_cents < 0",
                )?
                .query_row(rusqlite::params![household_id, category_id, t], |row| row.get(0))?;
            if prior > 0 {
                history.push(prior);
            }
        }
        if history.len() < 2 {
            continue;
        }
        let avg = history.iter().sum::<i64>() as f64 / history.len() as f64;
        let delta = spent - avg.round() as i64;
        if spent as f64 > avg * SPIKE_RATIO && delta > SPIKE_MIN_DELTA_CENTS {
            out.push(Insight {
                severity: Severity::Info,
                kind: InsightKind::Spike,
                message: format!(
                    "{name} spending spiked: {} this month vs a typical {}",
                    fmt::money(spent),
                    fmt::money(avg.round() as i64),
                ),
                amount_cents: delta,
            });
        }
    }
    Ok(out)
}

/// Inclusive date bounds of the 60-day window ending on the last day of `m`.
fn subscription_window(m: &str) -> Option<(String, String)> {
    let year: i32 = m.get(..4)?.parse().ok()?;
    let month: u32 = m.get(5..7)?.parse().ok()?;
    let next_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let end = next_first.pred_opt()?;
    let start = end - chrono::Duration::days(SUBSCRIPTION_WINDOW_DAYS - 1);
    Some((
        start.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    ))
}

/// A merchant with repeated near-identical charges in the recent window is
/// probably a subscription the user has not categorized as one. Individual
/// charge amounts are compared, so twice-in-one-month billing still counts.
fn subscription_insights(conn: &Connection, household_id: i64, m: &str) -> Result<Vec<Insight>> {
    let Some((start, end)) = subscription_window(m) else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare(
        "SELECT mr.display_name, mr.default_category_id, COUNT(*), \
                MIN(-t.amount_cents), MAX(-t.amount_cents), AVG(-t.amount_cents) \
         FROM transactions t \
         JOIN accounts a ON a.id = t.account_id \
         JOIN merchants mr ON mr.id = t.merchant_id \
         WHERE a.household_id = ?1 AND t.amount_cents < 0 \
           AND t.posted_date >= ?2 AND t.posted_date <= ?3 \
         GROUP BY t.merchant_id \
         ORDER BY mr.merchant_key",
    )?;
    let rows = stmt.query_map(rusqlite::params![household_id, start, end], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<i64>>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, f64>(5)?,
        ))
    })?;

    let subscriptions_cat: Option<i64> = conn
        .prepare_cached(
            "SELECT id FROM categories WHERE household_id = ?1 AND name = 'Subscriptions'",
        )?
        .query_row([household_id], |row| row.get(0))
        .ok();

    let mut out = Vec::new();
    for row in rows {
        let (display_name, default_cat, count, min, max, avg) = row?;
        if count < 2 || avg <= 0.0 {
            continue;
        }
        // Already filed under Subscriptions: nothing to suggest
        if default_cat.is_some() && default_cat == subscriptions_cat {
            continue;
        }
        let steady = (avg - min as f64) <= avg * SUBSCRIPTION_TOLERANCE
            && (max as f64 - avg) <= avg * SUBSCRIPTION_TOLERANCE;
        if steady {
            out.push(Insight {
                severity: Severity::Info,
                kind: InsightKind::SubscriptionCandidate,
                message: format!(
                    "{display_name} looks like a subscription: {count} charges of about {}",
                    fmt::money(avg.round() as i64),
                ),
                amount_cents: avg.round() as i64,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budgets;
    use crate::db::{create_household, get_connection, init_db};
    use crate::merchant;

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

    fn add_txn(
        conn: &Connection,
        account_id: i64,
        date: &str,
        cents: i64,
        category_id: Option<i64>,
        merchant_id: Option<i64>,
    ) {
        let fp = format!("fp-{date}-{cents}-{}", conn.last_insert_rowid());
        conn.execute(
            "INSERT INTO transactions \
             (account_id, import_id, posted_date, description, amount_cents, fingerprint, \
              category_id, merchant_id) \
             VALUES (?1, 1, ?2, 'row', ?3, ?4, ?5, ?6)",
            rusqlite::params![account_id, date, cents, fp, category_id, merchant_id],
        )
        .unwrap();
    }

    #[test]
    fn test_overspend_warning() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        budgets::upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        add_txn(&conn, acct, "2026-01-10", -55_000, Some(groceries), None);

        let insights = generate(&conn, hh, "2026-01").unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].severity, Severity::Warning);
        assert_eq!(insights[0].kind, InsightKind::Overspend);
        assert_eq!(insights[0].amount_cents, 15_000);
        assert!(insights[0].message.contains("Groceries"));
        assert!(insights[0].message.contains("138%"));
    }

    #[test]
    fn test_under_budget_is_quiet() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        budgets::upsert(&conn, hh, "2026-01", groceries, 40_000).unwrap();
        add_txn(&conn, acct, "2026-01-10", -30_000, Some(groceries), None);
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_spike_needs_history() {
        let (_dir, conn, hh, acct) = test_db();
        let dining = category(&conn, hh, "Dining");
        // Only one prior month with spend: no baseline, no spike
        add_txn(&conn, acct, "2025-12-10", -10_000, Some(dining), None);
        add_txn(&conn, acct, "2026-01-10", -40_000, Some(dining), None);
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_spike_detected_against_trailing_average() {
        let (_dir, conn, hh, acct) = test_db();
        let dining = category(&conn, hh, "Dining");
        add_txn(&conn, acct, "2025-11-10", -10_000, Some(dining), None);
        add_txn(&conn, acct, "2025-12-10", -12_000, Some(dining), None);
        add_txn(&conn, acct, "2026-01-10", -40_000, Some(dining), None);

        let insights = generate(&conn, hh, "2026-01").unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Spike);
        assert_eq!(insights[0].severity, Severity::Info);
        // 40_000 against an 11_000 average
        assert_eq!(insights[0].amount_cents, 29_000);
    }

    #[test]
    fn test_small_spike_ignored() {
        let (_dir, conn, hh, acct) = test_db();
        let coffee = category(&conn, hh, "Coffee");
        add_txn(&conn, acct, "2025-11-10", -1_000, Some(coffee), None);
        add_txn(&conn, acct, "2025-12-10", -1_000, Some(coffee), None);
        // Triple the baseline, but only a $20 delta
        add_txn(&conn, acct, "2026-01-10", -3_000, Some(coffee), None);
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_subscription_candidate() {
        let (_dir, conn, hh, acct) = test_db();
        let m = merchant::resolve(&conn, hh, "netflix", "NETFLIX.COM").unwrap();
        add_txn(&conn, acct, "2025-12-15", -1_549, None, Some(m.id));
        add_txn(&conn, acct, "2026-01-15", -1_549, None, Some(m.id));

        let insights = generate(&conn, hh, "2026-01").unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::SubscriptionCandidate);
        assert!(insights[0].message.contains("Netflix.com"));
    }

    #[test]
    fn test_subscription_two_charges_in_same_month() {
        let (_dir, conn, hh, acct) = test_db();
        let m = merchant::resolve(&conn, hh, "netflix", "NETFLIX.COM").unwrap();
        // Billed twice inside one calendar month; per-charge comparison
        // still sees two steady charges
        add_txn(&conn, acct, "2026-01-05", -1_549, None, Some(m.id));
        add_txn(&conn, acct, "2026-01-20", -1_549, None, Some(m.id));

        let insights = generate(&conn, hh, "2026-01").unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::SubscriptionCandidate);
        assert_eq!(insights[0].amount_cents, 1_549);
    }

    #[test]
    fn test_subscription_window_excludes_old_charges() {
        let (_dir, conn, hh, acct) = test_db();
        let m = merchant::resolve(&conn, hh, "netflix", "NETFLIX.COM").unwrap();
        // Second charge is more than 60 days before the end of January
        add_txn(&conn, acct, "2025-10-15", -1_549, None, Some(m.id));
        add_txn(&conn, acct, "2026-01-15", -1_549, None, Some(m.id));
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_varying_amounts_are_not_subscriptions() {
        let (_dir, conn, hh, acct) = test_db();
        let m = merchant::resolve(&conn, hh, "safeway", "SAFEWAY").unwrap();
        add_txn(&conn, acct, "2025-12-15", -4_200, None, Some(m.id));
        add_txn(&conn, acct, "2026-01-15", -9_800, None, Some(m.id));
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_known_subscription_not_flagged_again() {
        let (_dir, conn, hh, acct) = test_db();
        let subs = category(&conn, hh, "Subscriptions");
        let m = merchant::resolve(&conn, hh, "netflix", "NETFLIX.COM").unwrap();
        merchant::set_default_category(&conn, hh, m.id, subs, 1.0).unwrap();
        add_txn(&conn, acct, "2025-12-15", -1_549, Some(subs), Some(m.id));
        add_txn(&conn, acct, "2026-01-15", -1_549, Some(subs), Some(m.id));
        assert!(generate(&conn, hh, "2026-01").unwrap().is_empty());
    }

    #[test]
    fn test_warnings_sort_before_info_then_by_magnitude() {
        let (_dir, conn, hh, acct) = test_db();
        let groceries = category(&conn, hh, "Groceries");
        let dining = category(&conn, hh, "Dining");
        // Two overspends of different sizes plus a subscription candidate
        budgets::upsert(&conn, hh, "2026-01", groceries, 10_000).unwrap();
        budgets::upsert(&conn, hh, "2026-01", dining, 10_000).unwrap();
        add_txn(&conn, acct, "2026-01-10", -12_000, Some(groceries), None);
        add_txn(&conn, acct, "2026-01-11", -30_000, Some(dining), None);
        let m = merchant::resolve(&conn, hh, "netflix", "NETFLIX.COM").unwrap();
        add_txn(&conn, acct, "2025-12-15", -1_549, None, Some(m.id));
        add_txn(&conn, acct, "2026-01-15", -1_549, None, Some(m.id));

        let insights = generate(&conn, hh, "2026-01").unwrap();
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].severity, Severity::Warning);
        assert_eq!(insights[0].amount_cents, 20_000); // dining overage first
        assert_eq!(insights[1].severity, Severity::Warning);
        assert_eq!(insights[1].amount_cents, 2_000);
        assert_eq!(insights[2].severity, Severity::Info);
    }
}
