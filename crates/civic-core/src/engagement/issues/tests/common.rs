use axum::response::Response;
use axum::{Extension, Router};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::engagement::citizens::{Citizen, CitizenId};
use crate::engagement::issues::repository::IssueRepository;
use crate::engagement::issues::{
    issue_router, Issue, IssueCategory, IssueId, IssueService, IssueStatus, NewIssue, RequestKind,
};
use crate::gateway::Session;
use crate::store::Database;

pub(super) async fn database() -> Database {
    Database::in_memory().await.expect("in-memory database")
}

pub(super) fn pothole() -> NewIssue {
    NewIssue {
        title: "Pothole on Selby Ave".to_string(),
        category: "infrastructure".to_string(),
        location: "44.9465,-93.1391".to_string(),
        kind: RequestKind::Report,
        description: Some("Deep enough to flatten a tire".to_string()),
    }
}

pub(super) fn citizen(suffix: &str) -> Citizen {
    Citizen {
        id: CitizenId(format!("citizen-{suffix}")),
        name: format!("Resident {suffix}"),
        neighborhood: "summit-university".to_string(),
        registered_at: base_time(),
    }
}

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

/// Insert an issue directly so tests control timestamps and vote counts.
pub(super) async fn seed_issue(
    database: &Database,
    id: &str,
    category: IssueCategory,
    votes: i64,
    minutes_after_base: i64,
) -> Issue {
    let created_at = base_time() + Duration::minutes(minutes_after_base);
    let issue = Issue {
        id: IssueId(id.to_string()),
        kind: RequestKind::Report,
        title: format!("Seeded {id}"),
        description: None,
        category,
        location: "City Hall".to_string(),
        status: IssueStatus::Submitted,
        votes,
        submitted_by: None,
        created_at,
        updated_at: created_at,
    };
    IssueRepository::new(database.clone())
        .insert(&issue)
        .await
        .expect("seed insert");
    issue
}

pub(super) fn router_as(service: IssueService, session: Session) -> Router {
    issue_router(Arc::new(service)).layer(Extension(session))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
