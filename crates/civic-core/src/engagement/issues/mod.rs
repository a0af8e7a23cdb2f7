//! Issue reports and permit applications (the "311" module).
//!
//! Citizens file reports under a fixed category set and upvote the ones they
//! care about; staff move them through `submitted -> in_review ->
//! resolved | rejected`. Every transition is kept in an audit trail.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Issue, IssueCategory, IssueEvent, IssueExport, IssueId, IssueQuery, IssueSort, IssueStats,
    IssueStatus, IssueTransition, NewIssue, RequestKind, SupportReceipt, UnknownCategory,
};
pub use router::issue_router;
pub use service::{IssueService, IssueServiceError};
