use rusqlite::Connection;

use crate::error::{HearthError, Result};
use crate::models::Category;

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        household_id: row.get(1)?,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        is_active: row.get(4)?,
    })
}

const CATEGORY_COLS: &str = "id, household_id, name, parent_id, is_active";

pub fn get(conn: &Connection, household_id: i64, category_id: i64) -> Result<Category> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CATEGORY_COLS} FROM categories WHERE id = ?1 AND household_id = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![category_id, household_id])?;
    match rows.next()? {
        Some(row) => Ok(row_to_category(row)?),
        None => Err(HearthError::CategoryNotFound(category_id)),
    }
}

pub fn find_by_name(conn: &Connection, household_id: i64, name: &str) -> Result<Option<Category>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CATEGORY_COLS} FROM categories \
         WHERE household_id = ?1 AND name = ?2 COLLATE NOCASE AND is_active = 1"
    ))?;
    let mut rows = stmt.query(rusqlite::params![household_id, name])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_category(row)?)),
        None => Ok(None),
    }
}

pub fn add(
    conn: &Connection,
    household_id: i64,
    name: &str,
    parent_id: Option<i64>,
) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HearthError::Validation("category name cannot be empty".to_string()));
    }
    if let Some(pid) = parent_id {
        // Also rejects cross-household parents
        get(conn, household_id, pid)?;
    }
    // The unique constraint misses NULL parents (NULLs compare distinct),
    // so duplicates are checked here
    let duplicate: bool = conn
        .prepare_cached(
            "SELECT 1 FROM categories \
             WHERE household_id = ?1 AND name = ?2 COLLATE NOCASE AND parent_id IS ?3",
        )?
        .exists(rusqlite::params![household_id, name, parent_id])?;
    if duplicate {
        return Err(HearthError::Validation(format!(
            "category '{name}' already exists at this level"
        )));
    }
    conn.execute(
        "INSERT INTO categories (household_id, name, parent_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![household_id, name, parent_id],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            HearthError::Validation(format!("category '{name}' already exists at this level"))
        }
        other => HearthError::Db(other),
    })?;
    get(conn, household_id, conn.last_insert_rowid())
}

/// Walk the ancestor chain from `candidate_parent` to the root, failing if
/// it passes through `category_id`. Keeps the tree a tree.
fn assert_no_cycle(
    conn: &Connection,
    household_id: i64,
    category_id: i64,
    candidate_parent: i64,
) -> Result<()> {
    let mut current = Some(candidate_parent);
    while let Some(id) = current {
        if id == category_id {
            return Err(HearthError::Validation(
                "cannot move a category under one of its own descendants".to_string(),
            ));
        }
        current = conn
            .prepare_cached("SELECT parent_id FROM categories WHERE id = ?1 AND household_id = ?2")?
            .query_row(rusqlite::params![id, household_id], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(|_| HearthError::CategoryNotFound(id))?;
    }
    Ok(())
}

pub fn set_parent(
    conn: &Connection,
    household_id: i64,
    category_id: i64,
    parent_id: Option<i64>,
) -> Result<Category> {
    get(conn, household_id, category_id)?;
    if let Some(pid) = parent_id {
        if pid == category_id {
            return Err(HearthError::Validation(
                "a category cannot be its own parent".to_string(),
            ));
        }
        assert_no_cycle(conn, household_id, category_id, pid)?;
    }
    conn.execute(
        "UPDATE categories SET parent_id = ?1 WHERE id = ?2 AND household_id = ?3",
        rusqlite::params![parent_id, category_id, household_id],
    )?;
    get(conn, household_id, category_id)
}

pub fn rename(
    conn: &Connection,
    household_id: i64,
    category_id: i64,
    new_name: &str,
) -> Result<Category> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(HearthError::Validation("category name cannot be empty".to_string()));
    }
    let updated = conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2 AND household_id = ?3",
        rusqlite::params![new_name, category_id, household_id],
    )?;
    if updated == 0 {
        return Err(HearthError::CategoryNotFound(category_id));
    }
    get(conn, household_id, category_id)
}

/// Soft-delete. Existing transactions keep their category; the category just
/// stops being offered and stops matching by-name lookups.
pub fn disable(conn: &Connection, household_id: i64, category_id: i64) -> Result<Category> {
    let updated = conn.execute(
        "UPDATE categories SET is_active = 0 WHERE id = ?1 AND household_id = ?2",
        rusqlite::params![category_id, household_id],
    )?;
    if updated == 0 {
        return Err(HearthError::CategoryNotFound(category_id));
    }
    get(conn, household_id, category_id)
}

pub fn list(conn: &Connection, household_id: i64, include_inactive: bool) -> Result<Vec<Category>> {
    let sql = if include_inactive {
        format!("SELECT {CATEGORY_COLS} FROM categories WHERE household_id = ?1 ORDER BY name")
    } else {
        format!(
            "SELECT {CATEGORY_COLS} FROM categories \
             WHERE household_id = ?1 AND is_active = 1 ORDER BY name"
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([household_id], |row| row_to_category(row))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
