pub mod accounts;
pub mod budget;
pub mod categories;
pub mod import;
pub mod init;
pub mod insights;
pub mod merchants;
pub mod report;
pub mod status;
pub mod tx;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::settings;

/// Open the configured database and pick the household the CLI works on.
pub(crate) fn open() -> Result<(Connection, i64)> {
    let conn = db::get_connection(&settings::db_path())?;
    let household_id = db::default_household(&conn)?;
    Ok((conn, household_id))
}

/// Resolve a category argument that may be an id or a (case-insensitive) name.
pub(crate) fn resolve_category(conn: &Connection, household_id: i64, raw: &str) -> Result<i64> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(crate::categories::get(conn, household_id, id)?.id);
    }
    crate::categories::find_by_name(conn, household_id, raw)?
        .map(|c| c.id)
        .ok_or_else(|| crate::error::HearthError::UnknownCategory(raw.to_string()))
}

#[derive(Parser)]
#[command(name = "hearth", about = "Household bookkeeping: imports, merchant learning, budgets.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Hearth: choose a data directory and initialize the database.
    Init {
        /// Path for Hearth data (default: ~/Documents/hearth)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Household name recorded at setup
        #[arg(long, default_value = "My household")]
        household: String,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a statement CSV and auto-categorize what it can.
    Import {
        /// Path to CSV file to import
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
        /// Importer format key (e.g. bofa_checking); auto-detected if omitted
        #[arg(long)]
        format: Option<String>,
    },
    /// Inspect and edit transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Inspect learned merchants.
    Merchants {
        #[command(subcommand)]
        command: MerchantsCommands,
    },
    /// Manage the category tree.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage monthly budgets.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Monthly spending summary with budget usage.
    Report {
        /// Restrict to one month: YYYY-MM (shorthand for --from X --to X)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        month: Option<String>,
        /// First month of the range (inclusive)
        #[arg(long)]
        from: Option<String>,
        /// Last month of the range (inclusive)
        #[arg(long)]
        to: Option<String>,
        /// Restrict to one account by name
        #[arg(long)]
        account: Option<String>,
    },
    /// Overspend, spike, and subscription findings for a month.
    Insights {
        /// Month: YYYY-MM
        month: String,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name (must be unique)
        name: String,
        /// Account type: checking, savings, credit_card
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
        /// Last four digits of the account number
        #[arg(long = "last-four")]
        last_four: Option<String>,
    },
    /// List accounts.
    List,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions, newest first.
    List {
        /// Restrict to one account by name
        #[arg(long)]
        account: Option<String>,
        /// Restrict to one month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Restrict to one category (id or name)
        #[arg(long)]
        category: Option<String>,
        /// Only transactions without a category
        #[arg(long)]
        uncategorized: bool,
    },
    /// Set category and/or reviewed flag on one transaction.
    Set {
        /// Transaction id
        id: i64,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
        /// Mark reviewed (or --reviewed=false to clear)
        #[arg(long)]
        reviewed: Option<bool>,
        /// Also make this the merchant's default and recategorize its
        /// other uncategorized transactions
        #[arg(long = "apply-to-merchant")]
        apply_to_merchant: bool,
    },
    /// Apply one change to many transactions at once.
    Bulk {
        /// Transaction ids
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
        /// Mark reviewed
        #[arg(long)]
        reviewed: Option<bool>,
        /// Also update each touched merchant's default category
        #[arg(long = "apply-to-merchant")]
        apply_to_merchant: bool,
    },
}

#[derive(Subcommand)]
pub enum MerchantsCommands {
    /// List learned merchants.
    List,
    /// Set a merchant's default category.
    SetCategory {
        /// Merchant id
        id: i64,
        /// Category id or name
        category: String,
    },
    /// Reapply a merchant's default category to its transactions.
    Recategorize {
        /// Merchant id
        id: i64,
        /// Overwrite categorized transactions too, not just blank ones
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories.
    List {
        /// Include disabled categories
        #[arg(long)]
        all: bool,
    },
    /// Add a category.
    Add {
        /// Category name
        name: String,
        /// Parent category (id or name)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Move a category under a new parent (or to the top level).
    Move {
        /// Category id
        id: i64,
        /// New parent (id or name); omit to move to the top level
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename a category.
    Rename {
        /// Category id
        id: i64,
        /// New name
        name: String,
    },
    /// Disable a category. Existing transactions keep it.
    Disable {
        /// Category id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set (or replace) the limit for a month and category.
    Set {
        /// Month: YYYY-MM
        month: String,
        /// Category id or name
        category: String,
        /// Limit in dollars, e.g. 400 or 400.50
        limit: String,
    },
    /// List budgets.
    List {
        /// Restrict to one month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Remove a budget.
    Delete {
        /// Budget id
        id: i64,
    },
}
