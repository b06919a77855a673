use comfy_table::{Cell, Table};

use crate::error::Result;

pub fn add(
    name: &str,
    account_type: &str,
    institution: Option<&str>,
    last_four: Option<&str>,
) -> Result<()> {
    let (conn, household_id) = super::open()?;
    conn.execute(
        "INSERT INTO accounts (household_id, name, account_type, institution, last_four) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![household_id, name, account_type, institution, last_four],
    )?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let (conn, household_id) = super::open()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, account_type, institution, last_four \
         FROM accounts WHERE household_id = ?1 ORDER BY name",
    )?;
    let rows: Vec<(i64, String, String, Option<String>, Option<String>)> = stmt
        .query_map([household_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Institution", "Last Four"]);
    for (id, name, acct_type, inst, last) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(acct_type),
            Cell::new(inst.unwrap_or_default()),
            Cell::new(last.unwrap_or_default()),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
