#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub household_id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Merchant {
    pub id: i64,
    pub household_id: i64,
    pub merchant_key: String,
    pub display_name: String,
    pub default_category_id: Option<i64>,
    pub confidence: Option<f64>,
}

/// One posted statement row. Amounts are exact integer cents; negative is
/// money out. The sign comes from the statement and is never rewritten.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub import_id: i64,
    pub posted_date: String,
    pub description: String,
    pub amount_cents: i64,
    pub merchant_key: Option<String>,
    pub merchant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_reviewed: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Budget {
    pub id: i64,
    pub household_id: i64,
    pub month: String,
    pub category_id: i64,
    pub limit_cents: i64,
}

/// Intermediate representation from a statement parser before DB insert.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub date: String,
    pub description: String,
    pub amount_cents: i64,
}
