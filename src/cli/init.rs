use std::path::PathBuf;

use crate::db::{create_household, get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, shellexpand_path, Settings};

pub fn run(data_dir: Option<String>, household: &str) -> Result<()> {
    let mut settings = Settings::default();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    settings.household_name = household.to_string();

    let data_dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("hearth.db");
    let fresh = !db_path.exists();

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    if fresh {
        create_household(&conn, household)?;
        println!("Created household '{household}' with default categories.");
    }
    save_settings(&settings)?;

    println!("Data dir: {}", data_dir.display());
    println!("Database: {}", db_path.display());
    println!("Next: `hearth accounts add <name>` then `hearth import <file> --account <name>`.");
    Ok(())
}
