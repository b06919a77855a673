use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("hearth.db");

    println!(
        "Household:  {}",
        if settings.household_name.is_empty() { "(not set)" } else { &settings.household_name }
    );
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let uncategorized: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE category_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        let merchants: i64 = conn.query_row("SELECT count(*) FROM merchants", [], |r| r.get(0))?;
        let budgets: i64 = conn.query_row(
            "SELECT count(*) FROM budgets WHERE is_active = 1",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Accounts:       {accounts}");
        println!("Transactions:   {transactions}");
        println!("Uncategorized:  {uncategorized}");
        println!("Merchants:      {merchants}");
        println!("Budgets:        {budgets}");
    } else {
        println!();
        println!("Database not found. Run `hearth init` to set up.");
    }

    Ok(())
}
