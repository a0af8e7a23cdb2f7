use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::citizens::CitizenId;

/// Identifier wrapper for issue reports and permit applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub String);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of categories citizens can file under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Infrastructure,
    Safety,
    Environment,
    Community,
    Transit,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::Infrastructure,
        IssueCategory::Safety,
        IssueCategory::Environment,
        IssueCategory::Community,
        IssueCategory::Transit,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            IssueCategory::Infrastructure => "infrastructure",
            IssueCategory::Safety => "safety",
            IssueCategory::Environment => "environment",
            IssueCategory::Community => "community",
            IssueCategory::Transit => "transit",
        }
    }

    pub fn valid_labels() -> String {
        Self::ALL
            .iter()
            .map(|category| category.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a category label is not one of [`IssueCategory::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid category '{0}'; must be one of: {}", IssueCategory::valid_labels())]
pub struct UnknownCategory(pub String);

impl FromStr for IssueCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == normalized)
            .ok_or_else(|| UnknownCategory(value.trim().to_string()))
    }
}

/// Whether a request reports a problem or applies for a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Report,
    Permit,
}

impl RequestKind {
    pub const fn label(self) -> &'static str {
        match self {
            RequestKind::Report => "report",
            RequestKind::Permit => "permit",
        }
    }

    pub(crate) fn from_label(value: &str) -> Option<Self> {
        match value {
            "report" => Some(RequestKind::Report),
            "permit" => Some(RequestKind::Permit),
            _ => None,
        }
    }
}

/// Lifecycle: submitted -> in_review -> resolved | rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Submitted,
    InReview,
    Resolved,
    Rejected,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 4] = [
        IssueStatus::Submitted,
        IssueStatus::InReview,
        IssueStatus::Resolved,
        IssueStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            IssueStatus::Submitted => "submitted",
            IssueStatus::InReview => "in_review",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
        }
    }

    pub(crate) fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == value)
    }

    pub const fn can_transition_to(self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Submitted, IssueStatus::InReview)
                | (IssueStatus::InReview, IssueStatus::Resolved)
                | (IssueStatus::InReview, IssueStatus::Rejected)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Rejected)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub kind: RequestKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: IssueCategory,
    pub location: String,
    pub status: IssueStatus,
    pub votes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<CitizenId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intake payload. The category stays a string so the error can list valid labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub category: String,
    pub location: String,
    #[serde(default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// Staff request to move an issue through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTransition {
    pub status: IssueStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// Audit entry for one status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueEvent {
    pub issue_id: IssueId,
    pub from: IssueStatus,
    pub to: IssueStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSort {
    /// Most supported first, newest breaking ties.
    #[default]
    Votes,
    Recent,
}

impl FromStr for IssueSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "votes" => Ok(IssueSort::Votes),
            "recent" => Ok(IssueSort::Recent),
            other => Err(format!("unknown sort '{other}' (expected votes or recent)")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueQuery {
    #[serde(default, deserialize_with = "parse_filter")]
    pub category: Option<IssueCategory>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default, deserialize_with = "parse_sort")]
    pub sort: IssueSort,
}

/// Query values go through `FromStr` so filters accept any letter case.
fn parse_filter<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn parse_sort<'de, D>(deserializer: D) -> Result<IssueSort, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(parse_filter(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueStats {
    pub total_issues: i64,
    pub average_votes: f64,
    pub by_category: BTreeMap<IssueCategory, i64>,
    pub by_status: BTreeMap<IssueStatus, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueExport {
    pub statistics: IssueStats,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportReceipt {
    pub issue_id: IssueId,
    pub votes: i64,
}
