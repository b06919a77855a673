use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::categorizer::suggest_category;
use crate::error::{HearthError, Result};
use crate::merchant;
use crate::models::ParsedRow;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a statement amount into exact integer cents.
///
/// Accepts thousands separators, currency symbols, quotes, and
/// parenthesized negatives. Returns None for anything non-numeric so the
/// caller can count the row as a warning instead of importing $0.00.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    let (s, paren_negative) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (s, false),
    };
    let dash_negative = s.starts_with('-');
    let s = s.trim_start_matches(['-', '+']);
    if s.is_empty() {
        return None;
    }
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac_part.len() > 2 {
        return None;
    }
    let dollars: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut frac = frac_part.to_string();
    while frac.len() < 2 {
        frac.push('0');
    }
    let cents_frac: i64 = frac.parse().ok()?;
    let magnitude = dollars.checked_mul(100)?.checked_add(cents_frac)?;
    if paren_negative || dash_negative {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

/// Parse a posted date as ISO `YYYY-MM-DD` or US `M/D/YYYY`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Dedup fingerprint: stable hash of (account, date, amount, normalized
/// description). This is the idempotence guarantee for re-imports.
pub fn fingerprint(account_id: i64, row: &ParsedRow) -> String {
    let normalized_desc = row
        .description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{account_id}|{}|{}|{normalized_desc}",
        row.date, row.amount_cents
    ));
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Statement formats — enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

pub struct ParseOutcome {
    pub rows: Vec<ParsedRow>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImporterKind {
    GenericCsv,
    BofaChecking,
    BofaCreditCard,
}

impl ImporterKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::GenericCsv => "generic_csv",
            Self::BofaChecking => "bofa_checking",
            Self::BofaCreditCard => "bofa_credit_card",
        }
    }

    #[allow(dead_code)]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GenericCsv => "Generic CSV (Date,Description,Amount)",
            Self::BofaChecking => "Bank of America Checking",
            Self::BofaCreditCard => "Bank of America Credit Card",
        }
    }

    pub fn detect(&self, file_path: &Path) -> bool {
        match self {
            Self::GenericCsv => false, // fallback format, never auto-detected first
            Self::BofaChecking => detect_bofa_checking(file_path),
            Self::BofaCreditCard => detect_bofa_credit_card(file_path),
        }
    }

    pub fn parse(&self, file_path: &Path) -> Result<ParseOutcome> {
        match self {
            Self::GenericCsv => parse_generic_csv(file_path),
            Self::BofaChecking => parse_bofa_checking(file_path),
            Self::BofaCreditCard => parse_bofa_credit_card(file_path),
        }
    }
}

const ALL_IMPORTERS: &[ImporterKind] = &[
    ImporterKind::BofaChecking,
    ImporterKind::BofaCreditCard,
    ImporterKind::GenericCsv,
];

pub fn get_by_key(key: &str) -> Option<ImporterKind> {
    ALL_IMPORTERS.iter().find(|i| i.key() == key).copied()
}

pub fn get_for_file(file_path: &Path) -> ImporterKind {
    ALL_IMPORTERS
        .iter()
        .find(|i| i.detect(file_path))
        .copied()
        .unwrap_or(ImporterKind::GenericCsv)
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

pub struct ImportResult {
    pub import_id: i64,
    pub imported: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Ingest one statement file into an account of the given household.
///
/// Account names are only unique per household, so the lookup is scoped;
/// a name owned by another household is an unknown account here.
/// Re-importing the same statement is safe: every row already present (by
/// fingerprint) is counted as skipped, and the fingerprint's unique
/// constraint backstops concurrent imports of the same file. Unparseable
/// rows and categorization failures become warnings, never aborts; only
/// failing to read the file itself is fatal.
pub fn import_file(
    conn: &Connection,
    household_id: i64,
    file_path: &Path,
    account_name: &str,
    format_key: Option<&str>,
) -> Result<ImportResult> {
    let account_id: i64 = conn
        .prepare("SELECT id FROM accounts WHERE household_id = ?1 AND name = ?2")?
        .query_row(rusqlite::params![household_id, account_name], |row| row.get(0))
        .map_err(|_| HearthError::UnknownAccount(account_name.to_string()))?;

    let importer = match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| HearthError::UnknownFormat(key.to_string()))?,
        None => get_for_file(file_path),
    };

    let outcome = importer.parse(file_path)?;
    let mut warnings = outcome.warnings;

    conn.execute(
        "INSERT INTO imports (account_id, filename) VALUES (?1, ?2)",
        rusqlite::params![
            account_id,
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or("")
        ],
    )?;
    let import_id = conn.last_insert_rowid();

    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut seen = std::collections::HashSet::new();

    for row in &outcome.rows {
        let fp = fingerprint(account_id, row);
        if !seen.insert(fp.clone()) {
            skipped += 1;
            continue;
        }

        // Merchant resolution and categorization are best-effort per row
        let (merchant_key, merchant_id, category_id) = match resolve_row(conn, household_id, row) {
            Ok(resolved) => resolved,
            Err(e) => {
                warnings.push(format!("could not resolve merchant for '{}': {e}", row.description));
                (None, None, None)
            }
        };

        let inserted = conn.execute(
            "INSERT INTO transactions \
             (account_id, import_id, posted_date, description, amount_cents, fingerprint, \
              merchant_key, merchant_id, category_id, is_reviewed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0) \
             ON CONFLICT(account_id, fingerprint) DO NOTHING",
            rusqlite::params![
                account_id,
                import_id,
                row.date,
                row.description,
                row.amount_cents,
                fp,
                merchant_key,
                merchant_id,
                category_id,
            ],
        )?;
        if inserted == 0 {
            skipped += 1;
        } else {
            imported += 1;
        }
    }

    conn.execute(
        "UPDATE imports SET imported_count = ?1, skipped_count = ?2, warning_count = ?3 WHERE id = ?4",
        rusqlite::params![imported as i64, skipped as i64, warnings.len() as i64, import_id],
    )?;

    Ok(ImportResult {
        import_id,
        imported,
        skipped,
        warnings,
    })
}

fn resolve_row(
    conn: &Connection,
    household_id: i64,
    row: &ParsedRow,
) -> Result<(Option<String>, Option<i64>, Option<i64>)> {
    let key = merchant::normalize_key(&row.description);
    let resolved = merchant::resolve(conn, household_id, &key, &row.description)?;
    let category_id = suggest_category(&resolved);
    Ok((Some(key), Some(resolved.id), category_id))
}

// ---------------------------------------------------------------------------
// Generic CSV parser (Date,Description,Amount header)
// ---------------------------------------------------------------------------

fn parse_generic_csv(file_path: &Path) -> Result<ParseOutcome> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut found_header = false;
    let (mut idx_date, mut idx_desc, mut idx_amount) = (0usize, 1usize, 2usize);

    for (line_no, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(_) => {
                warnings.push(format!("line {}: unreadable CSV record", line_no + 1));
                continue;
            }
        };
        if !found_header {
            if record.len() >= 3 {
                for (i, field) in record.iter().enumerate() {
                    let f = field.trim().to_lowercase();
                    if f == "date" {
                        idx_date = i;
                        found_header = true;
                    }
                    if f.contains("description") || f == "payee" {
                        idx_desc = i;
                    }
                    if f == "amount" {
                        idx_amount = i;
                    }
                }
            }
            continue;
        }
        let min_cols = [idx_date, idx_desc, idx_amount].into_iter().max().unwrap_or(0) + 1;
        if record.len() < min_cols || record[idx_date].trim().is_empty() {
            continue;
        }
        let Some(date) = parse_date(&record[idx_date]) else {
            warnings.push(format!("line {}: bad date '{}'", line_no + 1, &record[idx_date]));
            continue;
        };
        let description = record[idx_desc].trim().to_string();
        if description.is_empty() {
            continue;
        }
        let Some(amount_cents) = parse_amount_cents(&record[idx_amount]) else {
            warnings.push(format!("line {}: bad amount '{}'", line_no + 1, &record[idx_amount]));
            continue;
        };
        rows.push(ParsedRow {
            date,
            description,
            amount_cents,
        });
    }

    if !found_header {
        warnings.push("no Date/Description/Amount header found".to_string());
    }
    Ok(ParseOutcome { rows, warnings })
}

// ---------------------------------------------------------------------------
// BofA Checking parser
// ---------------------------------------------------------------------------

fn detect_bofa_checking(file_path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(file_path) else {
        return false;
    };
    content.contains("Running Bal.")
}

fn parse_bofa_checking(file_path: &Path) -> Result<ParseOutcome> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut found_header = false;

    for (line_no, result) in rdr.records().enumerate() {
        let Ok(record) = result else { continue };
        if !found_header {
            if record.len() >= 4 && record[0].trim() == "Date" && record[1].contains("Description") {
                found_header = true;
            }
            continue;
        }
        if record.len() < 3 || record[0].trim().is_empty() {
            continue;
        }
        let Some(date) = parse_date(&record[0]) else {
            warnings.push(format!("line {}: bad date '{}'", line_no + 1, &record[0]));
            continue;
        };
        let description = record[1].trim().to_string();
        if description.is_empty() || description.contains("Beginning balance") {
            continue;
        }
        let Some(amount_cents) = parse_amount_cents(&record[2]) else {
            warnings.push(format!("line {}: bad amount '{}'", line_no + 1, &record[2]));
            continue;
        };
        rows.push(ParsedRow {
            date,
            description,
            amount_cents,
        });
    }
    Ok(ParseOutcome { rows, warnings })
}

// ---------------------------------------------------------------------------
// BofA Credit Card parser
// ---------------------------------------------------------------------------

fn detect_bofa_credit_card(file_path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(file_path) else {
        return false;
    };
    content.contains("Posting Date") && content.contains("Payee")
}

fn parse_bofa_credit_card(file_path: &Path) -> Result<ParseOutcome> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut found_header = false;
    let (mut idx_date, mut idx_desc, mut idx_amount, mut idx_type) = (0, 1, 2, 3);

    for (line_no, result) in rdr.records().enumerate() {
        let Ok(record) = result else { continue };
        if !found_header {
            if record.iter().any(|f| f.contains("Posting Date")) {
                for (i, field) in record.iter().enumerate() {
                    let f = field.trim();
                    if f == "Posting Date" { idx_date = i; }
                    if f == "Payee" { idx_desc = i; }
                    if f == "Amount" { idx_amount = i; }
                    if f == "Type" { idx_type = i; }
                }
                found_header = true;
            }
            continue;
        }
        let min_cols = [idx_date, idx_desc, idx_amount, idx_type].into_iter().max().unwrap_or(0) + 1;
        if record.len() < min_cols || record[idx_date].trim().is_empty() {
            continue;
        }
        let Some(date) = parse_date(&record[idx_date]) else {
            warnings.push(format!("line {}: bad date '{}'", line_no + 1, &record[idx_date]));
            continue;
        };
        let description = record[idx_desc].trim().to_string();
        let Some(amount) = parse_amount_cents(&record[idx_amount]) else {
            warnings.push(format!("line {}: bad amount '{}'", line_no + 1, &record[idx_amount]));
            continue;
        };
        // Type column: D = debit (money out), everything else credits
        let amount_cents = if record[idx_type].trim() == "D" {
            -amount.abs()
        } else {
            amount.abs()
        };
        rows.push(ParsedRow {
            date,
            description,
            amount_cents,
        });
    }
    Ok(ParseOutcome { rows, warnings })
}
