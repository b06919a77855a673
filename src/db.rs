use std::path::Path;

use rusqlite::Connection;

use crate::error::{HearthError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS households (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    household_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL,
    institution TEXT,
    last_four TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (household_id) REFERENCES households(id),
    UNIQUE (household_id, name)
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    household_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    parent_id INTEGER,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (household_id) REFERENCES households(id),
    FOREIGN KEY (parent_id) REFERENCES categories(id),
    UNIQUE (household_id, parent_id, name)
);

CREATE TABLE IF NOT EXISTS merchants (
    id INTEGER PRIMARY KEY,
    household_id INTEGER NOT NULL,
    merchant_key TEXT NOT NULL,
    display_name TEXT NOT NULL,
    default_category_id INTEGER,
    confidence REAL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (household_id) REFERENCES households(id),
    FOREIGN KEY (default_category_id) REFERENCES categories(id),
    UNIQUE (household_id, merchant_key)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    imported_count INTEGER DEFAULT 0,
    skipped_count INTEGER DEFAULT 0,
    warning_count INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    import_id INTEGER NOT NULL,
    posted_date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    fingerprint TEXT NOT NULL,
    merchant_key TEXT,
    merchant_id INTEGER,
    category_id INTEGER,
    is_reviewed INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (import_id) REFERENCES imports(id),
    FOREIGN KEY (merchant_id) REFERENCES merchants(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    UNIQUE (account_id, fingerprint)
);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    household_id INTEGER NOT NULL,
    month TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    limit_cents INTEGER NOT NULL,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (household_id) REFERENCES households(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    UNIQUE (household_id, month, category_id)
);
";

const DEFAULT_CATEGORIES: &[&str] = &[
    "Groceries",
    "Dining",
    "Coffee",
    "Transportation",
    "Utilities",
    "Housing",
    "Entertainment",
    "Subscriptions",
    "Health",
    "Shopping",
    "Travel",
    "Education",
    "Income",
    "Transfers",
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Create a household and seed it with the default category set.
pub fn create_household(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO households (name) VALUES (?1)", [name])?;
    let household_id = conn.last_insert_rowid();
    for cat in DEFAULT_CATEGORIES {
        conn.execute(
            "INSERT INTO categories (household_id, name) VALUES (?1, ?2)",
            rusqlite::params![household_id, cat],
        )?;
    }
    Ok(household_id)
}

/// The household the CLI operates on. Hearth is single-household per data
/// directory; multi-tenancy lives in the schema, not the front end.
pub fn default_household(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT id FROM households ORDER BY id LIMIT 1", [], |row| row.get(0))
        .map_err(|_| HearthError::Other("No household found. Run `hearth init` first.".to_string()))
}
