//! Budget transparency: published line items and per-department totals.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    BudgetQuery, BudgetSummary, DepartmentTotal, LineItem, LineItemId, NewLineItem, SummaryQuery,
};
pub use router::budget_router;
pub use service::{BudgetError, BudgetService};
