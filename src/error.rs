use thiserror::Error;

#[derive(Error, Debug)]
pub enum HearthError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No transaction with ID {0}")]
    TransactionNotFound(i64),

    #[error("No merchant with ID {0}")]
    MerchantNotFound(i64),

    #[error("No category with ID {0}")]
    CategoryNotFound(i64),

    #[error("No budget with ID {0}")]
    BudgetNotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HearthError>;
