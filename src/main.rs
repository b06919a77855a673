mod budgets;
mod categories;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod insights;
mod merchant;
mod models;
mod month;
mod reports;
mod settings;
mod transactions;

use clap::Parser;

use cli::{
    AccountsCommands, BudgetCommands, CategoriesCommands, Cli, Commands, MerchantsCommands,
    TxCommands,
};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, household } => cli::init::run(data_dir, &household),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                institution,
                last_four,
            } => cli::accounts::add(&name, &account_type, institution.as_deref(), last_four.as_deref()),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import {
            file,
            account,
            format,
        } => cli::import::run(&file, &account, format.as_deref()),
        Commands::Tx { command } => match command {
            TxCommands::List {
                account,
                month,
                category,
                uncategorized,
            } => cli::tx::list(
                account.as_deref(),
                month.as_deref(),
                category.as_deref(),
                uncategorized,
            ),
            TxCommands::Set {
                id,
                category,
                reviewed,
                apply_to_merchant,
            } => cli::tx::set(id, category.as_deref(), reviewed, apply_to_merchant),
            TxCommands::Bulk {
                ids,
                category,
                reviewed,
                apply_to_merchant,
            } => cli::tx::bulk(&ids, category.as_deref(), reviewed, apply_to_merchant),
        },
        Commands::Merchants { command } => match command {
            MerchantsCommands::List => cli::merchants::list(),
            MerchantsCommands::SetCategory { id, category } => {
                cli::merchants::set_category(id, &category)
            }
            MerchantsCommands::Recategorize { id, all } => cli::merchants::recategorize(id, all),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List { all } => cli::categories::list(all),
            CategoriesCommands::Add { name, parent } => {
                cli::categories::add(&name, parent.as_deref())
            }
            CategoriesCommands::Move { id, parent } => cli::categories::mv(id, parent.as_deref()),
            CategoriesCommands::Rename { id, name } => cli::categories::rename(id, &name),
            CategoriesCommands::Disable { id } => cli::categories::disable(id),
        },
        Commands::Budget { command } => match command {
            BudgetCommands::Set {
                month,
                category,
                limit,
            } => cli::budget::set(&month, &category, &limit),
            BudgetCommands::List { month } => cli::budget::list(month.as_deref()),
            BudgetCommands::Delete { id } => cli::budget::delete(id),
        },
        Commands::Report {
            month,
            from,
            to,
            account,
        } => cli::report::run(month.as_deref(), from.as_deref(), to.as_deref(), account.as_deref()),
        Commands::Insights { month } => cli::insights::run(&month),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
