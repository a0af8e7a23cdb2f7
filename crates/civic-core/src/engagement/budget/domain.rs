use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub String);

/// A published budget line. Amounts are whole cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub fiscal_year: i32,
    pub department: String,
    pub description: String,
    pub amount_cents: i64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub fiscal_year: i32,
    pub department: String,
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetQuery {
    #[serde(default)]
    pub fiscal_year: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryQuery {
    pub fiscal_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentTotal {
    pub department: String,
    pub line_items: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetSummary {
    pub fiscal_year: i32,
    pub departments: Vec<DepartmentTotal>,
    pub total_cents: i64,
}
