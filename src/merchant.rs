use std::sync::LazyLock;

use regex::Regex;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{HearthError, Result};
use crate::models::Merchant;

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Transaction-channel prefixes banks prepend to the merchant name.
/// Longest variants first so compound prefixes strip whole.
const STRIP_PREFIXES: &[&str] = &[
    "POS PURCHASE",
    "POS PUR",
    "POS DEBIT",
    "POS REFUND",
    "DEBIT CARD PURCHASE",
    "DEBIT CARD REFUND",
    "DEBIT CARD",
    "CREDIT CARD",
    "CHECKCARD",
    "CHECK CARD",
    "VISA DEBIT",
    "VISA CREDIT",
    "MASTERCARD DEBIT",
    "MASTERCARD CREDIT",
    "RECURRING PAYMENT",
    "RECURRING",
    "PREAUTHORIZED",
    "PRE-AUTHORIZED",
    "AUTHORIZED",
    "PURCHASE",
    "WITHDRAWAL",
    "ACH DEBIT",
    "ACH CREDIT",
    "ACH PAYMENT",
    "ACH",
    "WIRE TRANSFER",
    "WIRE",
    "ONLINE TRANSFER",
    "ONLINE PAYMENT",
    "ONLINE",
    "MOBILE PAYMENT",
    "MOBILE TRANSFER",
    "MOBILE",
    "ZELLE PAYMENT",
    "ZELLE TO",
    "ZELLE FROM",
    "ZELLE",
    "ATM WITHDRAWAL",
    "ATM DEPOSIT",
    "ATM",
    "DEPOSIT",
    "REFUND",
];

/// Tokens that identify a payment, not a merchant.
const GENERIC_TOKENS: &[&str] = &[
    "PAYMENT", "TRANSFER", "CHECK", "WITHDRAWAL", "DEPOSIT", "ONLINE", "CARD", "DEBIT",
    "CREDIT", "PURCHASE", "TRANSACTION", "TXN", "REF", "REFERENCE", "CONF", "CONFIRMATION",
    "AUTH", "AUTHORIZED", "PENDING", "POSTED", "FROM", "TO", "FOR", "THE", "AND", "INC",
    "LLC", "CORP", "LTD", "CO", "POS",
];

#[derive(Clone, Copy)]
enum MatchKind {
    StartsWith,
    Contains,
    Equals,
}

/// Well-known merchants whose statement lines vary too much for token
/// extraction alone (AMZN MKTP, SBUX, WAL-MART...).
const MERCHANT_MAPPINGS: &[(MatchKind, &str, &str)] = &[
    (MatchKind::StartsWith, "COSTCO", "costco"),
    (MatchKind::StartsWith, "AMZN", "amazon"),
    (MatchKind::Contains, "AMAZON", "amazon"),
    (MatchKind::Equals, "WAL-MART", "walmart"),
    (MatchKind::StartsWith, "WALMART", "walmart"),
    (MatchKind::StartsWith, "WAL MART", "walmart"),
    (MatchKind::StartsWith, "TARGET", "target"),
    (MatchKind::StartsWith, "STARBUCKS", "starbucks"),
    (MatchKind::StartsWith, "SBUX", "starbucks"),
    (MatchKind::StartsWith, "MCDONALD", "mcdonalds"),
    (MatchKind::StartsWith, "NETFLIX", "netflix"),
    (MatchKind::StartsWith, "SPOTIFY", "spotify"),
    (MatchKind::StartsWith, "UBER EATS", "uber eats"),
    (MatchKind::StartsWith, "UBEREATS", "uber eats"),
    (MatchKind::StartsWith, "UBER", "uber"),
    (MatchKind::StartsWith, "LYFT", "lyft"),
    (MatchKind::StartsWith, "DOORDASH", "doordash"),
    (MatchKind::StartsWith, "GRUBHUB", "grubhub"),
    (MatchKind::StartsWith, "CHEVRON", "chevron"),
    (MatchKind::StartsWith, "SHELL", "shell"),
    (MatchKind::StartsWith, "CVS", "cvs"),
    (MatchKind::StartsWith, "WALGREENS", "walgreens"),
    (MatchKind::StartsWith, "TRADER JOE", "trader joes"),
    (MatchKind::StartsWith, "WHOLE FOODS", "whole foods"),
    (MatchKind::StartsWith, "WHOLEFOODS", "whole foods"),
    (MatchKind::StartsWith, "HOME DEPOT", "home depot"),
    (MatchKind::StartsWith, "HOMEDEPOT", "home depot"),
    (MatchKind::StartsWith, "BEST BUY", "best buy"),
    (MatchKind::StartsWith, "BESTBUY", "best buy"),
];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b").unwrap());
static LONG_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5,}\b").unwrap());
static STORE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\d+").unwrap());
static TRAILING_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+\d+$").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*.\-—_]+").unwrap());
// Trailing "CITY ST" or bare "ST" location suffixes
static CITY_STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[A-Z]{2,}\s+[A-Z]{2}\s*$").unwrap());
static STATE_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[A-Z]{2}\s*$").unwrap());
static VALID_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9&.'\-]+$").unwrap());
static LETTERS_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+$").unwrap());

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_prefix_once(text: &str) -> String {
    for prefix in STRIP_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    text.to_string()
}

fn check_special_merchants(text: &str) -> Option<&'static str> {
    for (kind, pattern, canonical) in MERCHANT_MAPPINGS {
        let hit = match kind {
            MatchKind::StartsWith => text.starts_with(pattern),
            MatchKind::Contains => text.contains(pattern),
            MatchKind::Equals => text == *pattern,
        };
        if hit {
            return Some(canonical);
        }
    }
    None
}

fn remove_location_suffix(text: &str) -> String {
    let text = CITY_STATE_RE.replace(text, "").to_string();
    // Bare state codes only when enough merchant text remains before them
    if text.len() > 5 {
        return STATE_ONLY_RE.replace(&text, "").trim().to_string();
    }
    text.trim().to_string()
}

fn is_valid_token(token: &str) -> bool {
    token.len() >= 2
        && !GENERIC_TOKENS.contains(&token)
        && VALID_TOKEN_RE.is_match(token)
        && !token.chars().all(|c| c.is_ascii_digit())
}

fn is_strong_token(token: &str) -> bool {
    token.len() >= 3 && LETTERS_ONLY_RE.is_match(token)
}

/// Up to `max_tokens` meaningful tokens, letters-only tokens first.
fn extract_tokens(text: &str, max_tokens: usize) -> Vec<String> {
    let mut strong = Vec::new();
    let mut other = Vec::new();
    for raw in text.split_whitespace() {
        let token = raw.trim_matches(|c| ".,;:!?*".contains(c));
        if !is_valid_token(token) {
            continue;
        }
        if is_strong_token(token) {
            strong.push(token.to_string());
        } else {
            other.push(token.to_string());
        }
    }
    let mut result: Vec<String> = strong.into_iter().take(max_tokens).collect();
    for token in other {
        if result.len() >= max_tokens {
            break;
        }
        result.push(token);
    }
    result
}

/// One cleanup pass. Returns an empty string when nothing identifiable
/// survives; the caller decides the fallback.
fn normalize_pass(description: &str) -> String {
    let text = collapse_whitespace(&description.to_uppercase());
    let text = strip_prefix_once(&text);
    let text = SEPARATOR_RE.replace_all(&text, " ").to_string();
    let text = DATE_RE.replace_all(&text, "").to_string();
    let text = LONG_NUMBER_RE.replace_all(&text, "").to_string();
    let text = STORE_NUMBER_RE.replace_all(&text, "").to_string();
    let text = TRAILING_DIGITS_RE.replace(&text, "").to_string();
    let text = collapse_whitespace(&text);

    // Canonical merchants win before and after location stripping: the
    // suffix heuristic can eat trailing words some chains need.
    if let Some(canonical) = check_special_merchants(&text) {
        return canonical.to_uppercase();
    }
    let text = remove_location_suffix(&text);
    if let Some(canonical) = check_special_merchants(&text) {
        return canonical.to_uppercase();
    }

    extract_tokens(&text, 2).join(" ")
}

/// Derive a stable lowercase merchant key from a raw statement description.
///
/// Pure and idempotent: `normalize_key(normalize_key(x)) == normalize_key(x)`.
/// Never fails; descriptions with no identifiable merchant map to a hashed
/// placeholder so every transaction gets a key.
pub fn normalize_key(description: &str) -> String {
    let mut key = normalize_pass(description);
    // Run to a fixpoint so re-normalizing a key is a no-op
    for _ in 0..3 {
        if key.is_empty() {
            break;
        }
        let again = normalize_pass(&key);
        if again == key {
            break;
        }
        key = again;
    }
    if key.is_empty() {
        return placeholder_key(description);
    }
    key.to_lowercase()
}

/// Fallback key for empty or fully-generic descriptions. The `x` prefix keeps
/// the hash segment from ever looking like a strippable number.
fn placeholder_key(description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("unknown x{}", &digest[..12])
}

/// Title-case a raw description for use as an initial display name.
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

fn row_to_merchant(row: &rusqlite::Row) -> rusqlite::Result<Merchant> {
    Ok(Merchant {
        id: row.get(0)?,
        household_id: row.get(1)?,
        merchant_key: row.get(2)?,
        display_name: row.get(3)?,
        default_category_id: row.get(4)?,
        confidence: row.get(5)?,
    })
}

const MERCHANT_COLS: &str =
    "id, household_id, merchant_key, display_name, default_category_id, confidence";

fn find_by_key(conn: &Connection, household_id: i64, merchant_key: &str) -> Result<Option<Merchant>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {MERCHANT_COLS} FROM merchants WHERE household_id = ?1 AND merchant_key = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![household_id, merchant_key])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_merchant(row)?)),
        None => Ok(None),
    }
}

pub fn get(conn: &Connection, household_id: i64, merchant_id: i64) -> Result<Merchant> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {MERCHANT_COLS} FROM merchants WHERE id = ?1 AND household_id = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![merchant_id, household_id])?;
    match rows.next()? {
        Some(row) => Ok(row_to_merchant(row)?),
        None => Err(HearthError::MerchantNotFound(merchant_id)),
    }
}

/// Look up or lazily create the merchant for a key.
///
/// Creation races (two imports seeing the same new merchant) are resolved by
/// the (household_id, merchant_key) unique constraint: on conflict we lost
/// the race, so re-read the winner's row.
pub fn resolve(
    conn: &Connection,
    household_id: i64,
    merchant_key: &str,
    raw_description: &str,
) -> Result<Merchant> {
    if let Some(existing) = find_by_key(conn, household_id, merchant_key)? {
        return Ok(existing);
    }
    let inserted = conn.execute(
        "INSERT INTO merchants (household_id, merchant_key, display_name) VALUES (?1, ?2, ?3) \
         ON CONFLICT(household_id, merchant_key) DO NOTHING",
        rusqlite::params![household_id, merchant_key, title_case(raw_description)],
    )?;
    if inserted == 0 {
        // Lost a concurrent-create race; the row exists now
        return find_by_key(conn, household_id, merchant_key)?
            .ok_or_else(|| HearthError::Other(format!("Merchant vanished during resolve: {merchant_key}")));
    }
    find_by_key(conn, household_id, merchant_key)?
        .ok_or_else(|| HearthError::Other(format!("Merchant vanished during resolve: {merchant_key}")))
}

/// Record a user-confirmed merchant -> category association. Last write wins.
/// This is the only mutator of learned state; passive auto-categorization
/// never calls it.
pub fn set_default_category(
    conn: &Connection,
    household_id: i64,
    merchant_id: i64,
    category_id: i64,
    confidence: f64,
) -> Result<Merchant> {
    let category_ok: bool = conn
        .prepare_cached("SELECT 1 FROM categories WHERE id = ?1 AND household_id = ?2")?
        .exists(rusqlite::params![category_id, household_id])?;
    if !category_ok {
        return Err(HearthError::CategoryNotFound(category_id));
    }
    let updated = conn.execute(
        "UPDATE merchants SET default_category_id = ?1, confidence = ?2 \
         WHERE id = ?3 AND household_id = ?4",
        rusqlite::params![category_id, confidence, merchant_id, household_id],
    )?;
    if updated == 0 {
        return Err(HearthError::MerchantNotFound(merchant_id));
    }
    get(conn, household_id, merchant_id)
}

pub fn list(conn: &Connection, household_id: i64) -> Result<Vec<Merchant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MERCHANT_COLS} FROM merchants WHERE household_id = ?1 ORDER BY merchant_key"
    ))?;
    let rows = stmt.query_map([household_id], |row| row_to_merchant(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
