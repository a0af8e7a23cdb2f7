use axum::http::StatusCode;
use tracing::{info, warn};

use super::domain::{
    Issue, IssueCategory, IssueEvent, IssueExport, IssueId, IssueQuery, IssueSort, IssueStats,
    IssueStatus, IssueTransition, NewIssue, SupportReceipt, UnknownCategory,
};
use super::repository::{IssueRepository, SupportOutcome};
use crate::engagement::citizens::CitizenId;
use crate::store::{new_id, now, Database, StoreError};

/// Error raised by the issue service.
#[derive(Debug, thiserror::Error)]
pub enum IssueServiceError {
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("issue {0} not found")]
    NotFound(IssueId),
    #[error("citizen already supports issue {0}")]
    AlreadySupported(IssueId),
    #[error("cannot move issue from {from} to {to}")]
    InvalidTransition { from: IssueStatus, to: IssueStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("export serialization failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl IssueServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IssueServiceError::UnknownCategory(_) | IssueServiceError::Invalid(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IssueServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            IssueServiceError::AlreadySupported(_)
            | IssueServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            IssueServiceError::Store(_) | IssueServiceError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 311-style intake, triage and reporting over the shared store.
#[derive(Debug, Clone)]
pub struct IssueService {
    repository: IssueRepository,
}

impl IssueService {
    pub fn new(database: Database) -> Self {
        Self {
            repository: IssueRepository::new(database),
        }
    }

    /// File a new report or permit application in the `submitted` state.
    pub async fn report(
        &self,
        request: NewIssue,
        submitted_by: Option<&CitizenId>,
    ) -> Result<Issue, IssueServiceError> {
        let category: IssueCategory = request.category.parse()?;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(IssueServiceError::Invalid("title must not be empty"));
        }
        let location = request.location.trim();
        if location.is_empty() {
            return Err(IssueServiceError::Invalid("location must not be empty"));
        }

        let reported_at = now();
        let issue = Issue {
            id: IssueId(new_id("issue")),
            kind: request.kind,
            title: title.to_string(),
            description: request
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            category,
            location: location.to_string(),
            status: IssueStatus::Submitted,
            votes: 0,
            submitted_by: submitted_by.cloned(),
            created_at: reported_at,
            updated_at: reported_at,
        };

        self.repository.insert(&issue).await?;
        info!(issue = %issue.id, %category, kind = issue.kind.label(), "issue reported");
        Ok(issue)
    }

    pub async fn get(&self, id: &IssueId) -> Result<Issue, IssueServiceError> {
        self.repository
            .fetch(id)
            .await?
            .ok_or_else(|| IssueServiceError::NotFound(id.clone()))
    }

    pub async fn list(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueServiceError> {
        Ok(self.repository.list(query).await?)
    }

    /// Count one upvote per citizen; returns the new total.
    pub async fn upvote(
        &self,
        id: &IssueId,
        citizen: &CitizenId,
    ) -> Result<SupportReceipt, IssueServiceError> {
        match self.repository.add_support(id, citizen, now()).await? {
            SupportOutcome::Recorded { votes } => Ok(SupportReceipt {
                issue_id: id.clone(),
                votes,
            }),
            SupportOutcome::Duplicate => Err(IssueServiceError::AlreadySupported(id.clone())),
            SupportOutcome::Missing => Err(IssueServiceError::NotFound(id.clone())),
        }
    }

    pub async fn transition(
        &self,
        id: &IssueId,
        transition: IssueTransition,
        actor: &str,
    ) -> Result<Issue, IssueServiceError> {
        let current = self.get(id).await?;
        if !current.status.can_transition_to(transition.status) {
            warn!(issue = %id, from = %current.status, to = %transition.status, "rejected status transition");
            return Err(IssueServiceError::InvalidTransition {
                from: current.status,
                to: transition.status,
            });
        }

        let event = IssueEvent {
            issue_id: id.clone(),
            from: current.status,
            to: transition.status,
            note: transition
                .note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
            actor: actor.to_string(),
            recorded_at: now(),
        };

        if !self.repository.apply_transition(&event).await? {
            let latest = self.get(id).await?;
            return Err(IssueServiceError::InvalidTransition {
                from: latest.status,
                to: transition.status,
            });
        }

        info!(issue = %id, from = %event.from, to = %event.to, actor, "issue status changed");
        self.get(id).await
    }

    pub async fn history(&self, id: &IssueId) -> Result<Vec<IssueEvent>, IssueServiceError> {
        self.get(id).await?;
        Ok(self.repository.events(id).await?)
    }

    pub async fn stats(&self) -> Result<IssueStats, IssueServiceError> {
        let (total_issues, average) = self.repository.totals().await?;
        let average_votes = (average.unwrap_or(0.0) * 100.0).round() / 100.0;

        Ok(IssueStats {
            total_issues,
            average_votes,
            by_category: self.repository.count_by_category().await?,
            by_status: self.repository.count_by_status().await?,
        })
    }

    /// Statistics plus every issue, newest first.
    pub async fn export(&self) -> Result<IssueExport, IssueServiceError> {
        let statistics = self.stats().await?;
        let issues = self
            .list(&IssueQuery {
                sort: IssueSort::Recent,
                ..IssueQuery::default()
            })
            .await?;
        Ok(IssueExport { statistics, issues })
    }

    pub async fn export_json(&self) -> Result<String, IssueServiceError> {
        let export = self.export().await?;
        Ok(serde_json::to_string_pretty(&export)?)
    }
}
