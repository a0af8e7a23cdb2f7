use super::common::*;
use crate::engagement::issues::{
    IssueCategory, IssueId, IssueQuery, IssueService, IssueServiceError, IssueSort, IssueStatus,
    IssueTransition, RequestKind,
};

#[tokio::test]
async fn report_stores_submitted_issue_with_zero_votes() {
    let service = IssueService::new(database().await);
    let reporter = citizen("a");

    let issue = service
        .report(pothole(), Some(&reporter.id))
        .await
        .expect("report succeeds");

    assert!(issue.id.0.starts_with("issue-"));
    assert_eq!(issue.status, IssueStatus::Submitted);
    assert_eq!(issue.votes, 0);
    assert_eq!(issue.category, IssueCategory::Infrastructure);
    assert_eq!(issue.submitted_by, Some(reporter.id));
    assert_eq!(service.get(&issue.id).await.expect("fetch"), issue);
}

#[tokio::test]
async fn report_rejects_unknown_category() {
    let service = IssueService::new(database().await);
    let mut request = pothole();
    request.category = "parking".to_string();

    match service.report(request, None).await {
        Err(IssueServiceError::UnknownCategory(err)) => {
            assert!(err.to_string().contains("transit"));
        }
        other => panic!("expected category error, got {other:?}"),
    }
}

#[tokio::test]
async fn report_rejects_blank_title_and_location() {
    let service = IssueService::new(database().await);

    let mut blank_title = pothole();
    blank_title.title = "   ".to_string();
    assert!(matches!(
        service.report(blank_title, None).await,
        Err(IssueServiceError::Invalid(_))
    ));

    let mut blank_location = pothole();
    blank_location.location = String::new();
    assert!(matches!(
        service.report(blank_location, None).await,
        Err(IssueServiceError::Invalid(_))
    ));
}

#[tokio::test]
async fn permit_applications_keep_their_kind() {
    let service = IssueService::new(database().await);
    let mut request = pothole();
    request.kind = RequestKind::Permit;
    request.title = "Block party on Grand Ave".to_string();
    request.category = "Community".to_string();

    let issue = service.report(request, None).await.expect("permit filed");
    assert_eq!(issue.kind, RequestKind::Permit);
    assert_eq!(issue.category, IssueCategory::Community);
    assert!(issue.submitted_by.is_none());
}

#[tokio::test]
async fn upvote_counts_each_citizen_once() {
    let service = IssueService::new(database().await);
    let issue = service.report(pothole(), None).await.expect("report");

    let first = service
        .upvote(&issue.id, &citizen("a").id)
        .await
        .expect("first upvote");
    assert_eq!(first.votes, 1);
    let second = service
        .upvote(&issue.id, &citizen("b").id)
        .await
        .expect("second upvote");
    assert_eq!(second.votes, 2);

    assert!(matches!(
        service.upvote(&issue.id, &citizen("a").id).await,
        Err(IssueServiceError::AlreadySupported(_))
    ));
    assert_eq!(service.get(&issue.id).await.expect("fetch").votes, 2);
}

#[tokio::test]
async fn upvote_on_missing_issue_is_not_found() {
    let service = IssueService::new(database().await);
    let err = service
        .upvote(&IssueId("issue-missing".to_string()), &citizen("a").id)
        .await
        .expect_err("missing issue");
    assert!(matches!(err, IssueServiceError::NotFound(_)));
}

#[tokio::test]
async fn list_sorts_by_votes_then_recency() {
    let database = database().await;
    seed_issue(&database, "issue-old-popular", IssueCategory::Safety, 5, 0).await;
    seed_issue(&database, "issue-new-popular", IssueCategory::Transit, 5, 10).await;
    seed_issue(&database, "issue-newest", IssueCategory::Safety, 1, 20).await;
    let service = IssueService::new(database);

    let by_votes = service.list(&IssueQuery::default()).await.expect("list");
    let ids: Vec<_> = by_votes.iter().map(|issue| issue.id.0.as_str()).collect();
    assert_eq!(
        ids,
        vec!["issue-new-popular", "issue-old-popular", "issue-newest"]
    );

    let recent = service
        .list(&IssueQuery {
            sort: IssueSort::Recent,
            ..IssueQuery::default()
        })
        .await
        .expect("list");
    let ids: Vec<_> = recent.iter().map(|issue| issue.id.0.as_str()).collect();
    assert_eq!(
        ids,
        vec!["issue-newest", "issue-new-popular", "issue-old-popular"]
    );
}

#[tokio::test]
async fn list_filters_by_category_and_status() {
    let database = database().await;
    seed_issue(&database, "issue-1", IssueCategory::Safety, 0, 0).await;
    seed_issue(&database, "issue-2", IssueCategory::Transit, 0, 1).await;
    seed_issue(&database, "issue-3", IssueCategory::Safety, 0, 2).await;
    let service = IssueService::new(database);

    let safety = service
        .list(&IssueQuery {
            category: Some(IssueCategory::Safety),
            ..IssueQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(safety.len(), 2);
    assert!(safety
        .iter()
        .all(|issue| issue.category == IssueCategory::Safety));

    service
        .transition(
            &IssueId("issue-3".to_string()),
            IssueTransition {
                status: IssueStatus::InReview,
                note: None,
            },
            "staff",
        )
        .await
        .expect("transition");
    let in_review = service
        .list(&IssueQuery {
            status: Some(IssueStatus::InReview),
            ..IssueQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(in_review.len(), 1);
    assert_eq!(in_review[0].id.0, "issue-3");
}

#[tokio::test]
async fn transitions_follow_lifecycle_and_are_audited() {
    let service = IssueService::new(database().await);
    let issue = service.report(pothole(), None).await.expect("report");

    let skipped = service
        .transition(
            &issue.id,
            IssueTransition {
                status: IssueStatus::Resolved,
                note: None,
            },
            "staff",
        )
        .await;
    assert!(matches!(
        skipped,
        Err(IssueServiceError::InvalidTransition {
            from: IssueStatus::Submitted,
            to: IssueStatus::Resolved
        })
    ));

    let reviewing = service
        .transition(
            &issue.id,
            IssueTransition {
                status: IssueStatus::InReview,
                note: Some("Crew dispatched".to_string()),
            },
            "staff",
        )
        .await
        .expect("to in_review");
    assert_eq!(reviewing.status, IssueStatus::InReview);

    let resolved = service
        .transition(
            &issue.id,
            IssueTransition {
                status: IssueStatus::Resolved,
                note: Some("  ".to_string()),
            },
            "staff",
        )
        .await
        .expect("to resolved");
    assert_eq!(resolved.status, IssueStatus::Resolved);

    let history = service.history(&issue.id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from, IssueStatus::Submitted);
    assert_eq!(history[0].note.as_deref(), Some("Crew dispatched"));
    assert_eq!(history[1].to, IssueStatus::Resolved);
    assert!(history[1].note.is_none());
    assert!(history.iter().all(|event| event.actor == "staff"));
}

#[tokio::test]
async fn stats_cover_every_category_and_round_average() {
    let database = database().await;
    seed_issue(&database, "issue-1", IssueCategory::Safety, 1, 0).await;
    seed_issue(&database, "issue-2", IssueCategory::Safety, 1, 1).await;
    seed_issue(&database, "issue-3", IssueCategory::Transit, 0, 2).await;
    let service = IssueService::new(database);

    let stats = service.stats().await.expect("stats");
    assert_eq!(stats.total_issues, 3);
    assert_eq!(stats.average_votes, 0.67);
    assert_eq!(stats.by_category.len(), 5);
    assert_eq!(stats.by_category[&IssueCategory::Safety], 2);
    assert_eq!(stats.by_category[&IssueCategory::Environment], 0);
    assert_eq!(stats.by_status[&IssueStatus::Submitted], 3);
    assert_eq!(stats.by_status[&IssueStatus::Rejected], 0);
}

#[tokio::test]
async fn stats_on_empty_store_are_zero() {
    let service = IssueService::new(database().await);
    let stats = service.stats().await.expect("stats");
    assert_eq!(stats.total_issues, 0);
    assert_eq!(stats.average_votes, 0.0);
    assert!(stats.by_category.values().all(|count| *count == 0));
}

#[tokio::test]
async fn export_wraps_statistics_and_recent_issues() {
    let database = database().await;
    seed_issue(&database, "issue-older", IssueCategory::Environment, 9, 0).await;
    seed_issue(&database, "issue-newer", IssueCategory::Environment, 0, 5).await;
    let service = IssueService::new(database);

    let raw = service.export_json().await.expect("export");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");

    assert_eq!(value["statistics"]["total_issues"], 2);
    assert_eq!(value["statistics"]["by_category"]["environment"], 2);
    assert_eq!(value["issues"][0]["id"], "issue-newer");
    assert_eq!(value["issues"][1]["id"], "issue-older");
    assert!(raw.contains("\n  \"statistics\""), "pretty printed");
}
