use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::domain::{
    Issue, IssueCategory, IssueEvent, IssueId, IssueQuery, IssueSort, IssueStatus, RequestKind,
};
use crate::engagement::citizens::CitizenId;
use crate::store::{decode_timestamp, encode_timestamp, is_unique_violation, Database, StoreError};

const ISSUE_COLUMNS: &str = "id, kind, title, description, category, location, status, votes, \
                             submitted_by, created_at, updated_at";

#[derive(Debug, FromRow)]
struct IssueRow {
    id: String,
    kind: String,
    title: String,
    description: Option<String>,
    category: String,
    location: String,
    status: String,
    votes: i64,
    submitted_by: Option<String>,
    created_at: String,
    updated_at: String,
}

impl IssueRow {
    fn into_issue(self) -> Result<Issue, StoreError> {
        let kind = RequestKind::from_label(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown request kind '{}'", self.kind)))?;
        let category = self
            .category
            .parse::<IssueCategory>()
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let status = parse_status(&self.status)?;

        Ok(Issue {
            id: IssueId(self.id),
            kind,
            title: self.title,
            description: self.description,
            category,
            location: self.location,
            status,
            votes: self.votes,
            submitted_by: self.submitted_by.map(CitizenId),
            created_at: decode_timestamp(&self.created_at)?,
            updated_at: decode_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    issue_id: String,
    from_status: String,
    to_status: String,
    note: Option<String>,
    actor: String,
    recorded_at: String,
}

impl EventRow {
    fn into_event(self) -> Result<IssueEvent, StoreError> {
        Ok(IssueEvent {
            issue_id: IssueId(self.issue_id),
            from: parse_status(&self.from_status)?,
            to: parse_status(&self.to_status)?,
            note: self.note,
            actor: self.actor,
            recorded_at: decode_timestamp(&self.recorded_at)?,
        })
    }
}

fn parse_status(raw: &str) -> Result<IssueStatus, StoreError> {
    IssueStatus::from_label(raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown issue status '{raw}'")))
}

/// Result of recording a citizen's upvote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportOutcome {
    Recorded { votes: i64 },
    Duplicate,
    Missing,
}

/// SQLite persistence for issues, supporters and the status audit trail.
#[derive(Debug, Clone)]
pub struct IssueRepository {
    database: Database,
}

impl IssueRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn insert(&self, issue: &Issue) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO issues (id, kind, title, description, category, location, status, \
             votes, submitted_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&issue.id.0)
        .bind(issue.kind.label())
        .bind(&issue.title)
        .bind(issue.description.as_deref())
        .bind(issue.category.label())
        .bind(&issue.location)
        .bind(issue.status.label())
        .bind(issue.votes)
        .bind(issue.submitted_by.as_ref().map(|id| id.0.as_str()))
        .bind(encode_timestamp(issue.created_at))
        .bind(encode_timestamp(issue.updated_at))
        .execute(self.database.pool())
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, id: &IssueId) -> Result<Option<Issue>, StoreError> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?");
        let row = sqlx::query_as::<_, IssueRow>(&sql)
            .bind(&id.0)
            .fetch_optional(self.database.pool())
            .await?;
        row.map(IssueRow::into_issue).transpose()
    }

    pub async fn list(&self, query: &IssueQuery) -> Result<Vec<Issue>, StoreError> {
        let order = match query.sort {
            IssueSort::Votes => "votes DESC, created_at DESC, id DESC",
            IssueSort::Recent => "created_at DESC, id DESC",
        };
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues \
             WHERE (?1 IS NULL OR category = ?1) AND (?2 IS NULL OR status = ?2) \
             ORDER BY {order}"
        );

        let rows = sqlx::query_as::<_, IssueRow>(&sql)
            .bind(query.category.map(IssueCategory::label))
            .bind(query.status.map(IssueStatus::label))
            .fetch_all(self.database.pool())
            .await?;
        rows.into_iter().map(IssueRow::into_issue).collect()
    }

    /// Record one supporter and bump the cached vote count atomically.
    pub async fn add_support(
        &self,
        id: &IssueId,
        citizen: &CitizenId,
        at: DateTime<Utc>,
    ) -> Result<SupportOutcome, StoreError> {
        let mut tx = self.database.pool().begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM issues WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(SupportOutcome::Missing);
        }

        let inserted = sqlx::query(
            "INSERT INTO issue_supporters (issue_id, citizen_id, supported_at) VALUES (?, ?, ?)",
        )
        .bind(&id.0)
        .bind(&citizen.0)
        .bind(encode_timestamp(at))
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Ok(SupportOutcome::Duplicate),
            Err(err) => return Err(err.into()),
        }

        let (votes,): (i64,) = sqlx::query_as(
            "UPDATE issues SET votes = votes + 1, updated_at = ? WHERE id = ? RETURNING votes",
        )
        .bind(encode_timestamp(at))
        .bind(&id.0)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SupportOutcome::Recorded { votes })
    }

    /// Apply a status change only if the issue is still in `event.from`.
    /// Returns `false` when another writer moved it first.
    pub async fn apply_transition(&self, event: &IssueEvent) -> Result<bool, StoreError> {
        let mut tx = self.database.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE issues SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(event.to.label())
        .bind(encode_timestamp(event.recorded_at))
        .bind(&event.issue_id.0)
        .bind(event.from.label())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO issue_events (issue_id, from_status, to_status, note, actor, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.issue_id.0)
        .bind(event.from.label())
        .bind(event.to.label())
        .bind(event.note.as_deref())
        .bind(&event.actor)
        .bind(encode_timestamp(event.recorded_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn events(&self, id: &IssueId) -> Result<Vec<IssueEvent>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT issue_id, from_status, to_status, note, actor, recorded_at \
             FROM issue_events WHERE issue_id = ? ORDER BY seq",
        )
        .bind(&id.0)
        .fetch_all(self.database.pool())
        .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// `(total, average votes)`; the average is `None` for an empty table.
    pub async fn totals(&self) -> Result<(i64, Option<f64>), StoreError> {
        let totals = sqlx::query_as("SELECT COUNT(*), AVG(votes) FROM issues")
            .fetch_one(self.database.pool())
            .await?;
        Ok(totals)
    }

    pub async fn count_by_category(&self) -> Result<BTreeMap<IssueCategory, i64>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM issues GROUP BY category")
                .fetch_all(self.database.pool())
                .await?;

        let mut counts: BTreeMap<IssueCategory, i64> =
            IssueCategory::ALL.into_iter().map(|category| (category, 0)).collect();
        for (label, count) in rows {
            let category = label
                .parse::<IssueCategory>()
                .map_err(|err| StoreError::Corrupt(err.to_string()))?;
            counts.insert(category, count);
        }
        Ok(counts)
    }

    pub async fn count_by_status(&self) -> Result<BTreeMap<IssueStatus, i64>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM issues GROUP BY status")
                .fetch_all(self.database.pool())
                .await?;

        let mut counts: BTreeMap<IssueStatus, i64> =
            IssueStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        for (label, count) in rows {
            counts.insert(parse_status(&label)?, count);
        }
        Ok(counts)
    }
}
