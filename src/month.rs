//! `YYYY-MM` month strings: validation and arithmetic.
//!
//! Months are stored and compared as text; the zero-padded format makes
//! lexicographic order equal calendar order.

use crate::error::{HearthError, Result};

/// Validate a `YYYY-MM` string, returning it normalized (zero-padded).
pub fn parse(raw: &str) -> Result<String> {
    let invalid = || HearthError::Validation(format!("Invalid month '{raw}'. Expected YYYY-MM."));
    let (y, m) = raw.split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
        return Err(invalid());
    }
    Ok(format!("{year:04}-{month:02}"))
}

/// The month before a valid `YYYY-MM` string.
pub fn prev(month: &str) -> String {
    let (y, m) = split(month);
    if m == 1 {
        format!("{:04}-12", y - 1)
    } else {
        format!("{y:04}-{:02}", m - 1)
    }
}

fn split(month: &str) -> (i32, u32) {
    let (y, m) = month.split_once('-').unwrap_or(("0", "1"));
    (y.parse().unwrap_or(0), m.parse().unwrap_or(1))
}
