use colored::Colorize;

use crate::error::Result;
use crate::insights::{generate, Severity};

pub fn run(month: &str) -> Result<()> {
    let (conn, household_id) = super::open()?;
    let insights = generate(&conn, household_id, month)?;

    if insights.is_empty() {
        println!("Nothing unusual in {month}.");
        return Ok(());
    }
    for insight in &insights {
        let label = match insight.severity {
            Severity::Warning => insight.severity.label().red().bold(),
            Severity::Info => insight.severity.label().cyan(),
        };
        println!("[{label}] {}", insight.message);
    }
    Ok(())
}
