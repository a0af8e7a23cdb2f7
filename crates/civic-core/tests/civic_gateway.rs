use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use civic_core::city::CivicModule;
use civic_core::engagement::alerts::LogDispatcher;
use civic_core::gateway::{gateway_router, CivicServices};
use civic_core::store::Database;
use serde_json::{json, Value};
use tower::ServiceExt;

const STAFF_TOKEN: &str = "ops-7f3a";

async fn full_gateway() -> Router {
    let database = Database::in_memory().await.expect("in-memory database");
    let services = CivicServices::new(database, LogDispatcher);
    let modules = CivicModule::ALL.into_iter().collect();
    gateway_router(&services, &modules, Some(STAFF_TOKEN.to_string()))
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response: Response = router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json payload")
    };
    (status, payload)
}

async fn register(router: &Router, name: &str, neighborhood: &str) -> String {
    let (status, payload) = call(
        router,
        "POST",
        "/api/v1/citizens",
        None,
        Some(json!({ "name": name, "neighborhood": neighborhood })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    payload["session_token"]
        .as_str()
        .expect("session token")
        .to_string()
}

#[tokio::test]
async fn issue_lifecycle_through_gateway() {
    let router = full_gateway().await;
    let reporter = register(&router, "Lena", "Hamline Midway").await;
    let neighbor = register(&router, "Omar", "Hamline Midway").await;

    let (status, issue) = call(
        &router,
        "POST",
        "/api/v1/issues",
        Some(&reporter),
        Some(json!({
            "title": "Sidewalk heaved by tree roots",
            "category": "infrastructure",
            "location": "1500 Minnehaha Ave",
            "description": "Tripping hazard near the bus stop"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let issue_id = issue["id"].as_str().expect("issue id").to_string();

    let (status, receipt) = call(
        &router,
        "POST",
        &format!("/api/v1/issues/{issue_id}/upvote"),
        Some(&neighbor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["votes"], 1);

    let (status, _) = call(
        &router,
        "POST",
        &format!("/api/v1/issues/{issue_id}/status"),
        Some(&reporter),
        Some(json!({ "status": "in_review" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for next in ["in_review", "resolved"] {
        let (status, updated) = call(
            &router,
            "POST",
            &format!("/api/v1/issues/{issue_id}/status"),
            Some(STAFF_TOKEN),
            Some(json!({ "status": next, "note": "public works crew dispatched" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], next);
    }

    let (status, history) = call(
        &router,
        "GET",
        &format!("/api/v1/issues/{issue_id}/history"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().expect("history array");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["to"], "resolved");
    assert_eq!(history[1]["actor"], "staff");

    let (_, stats) = call(&router, "GET", "/api/v1/issues/stats", None, None).await;
    assert_eq!(stats["total_issues"], 1);
    assert_eq!(stats["by_status"]["resolved"], 1);
}

#[tokio::test]
async fn ballot_vote_and_tally_through_gateway() {
    let router = full_gateway().await;
    let voters = [
        register(&router, "Ana", "Como").await,
        register(&router, "Ben", "Como").await,
        register(&router, "Cai", "Como").await,
    ];

    let (status, ballot) = call(
        &router,
        "POST",
        "/api/v1/ballots",
        Some(STAFF_TOKEN),
        Some(json!({
            "title": "Convert Lexington Pkwy to three lanes",
            "options": ["Support", "Oppose"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ballot_id = ballot["id"].as_str().expect("ballot id").to_string();

    for (token, choice) in voters.iter().zip(["support", "Oppose", "SUPPORT"]) {
        let (status, receipt) = call(
            &router,
            "POST",
            &format!("/api/v1/ballots/{ballot_id}/votes"),
            Some(token),
            Some(json!({ "choice": choice })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(receipt["choice"] == "Support" || receipt["choice"] == "Oppose");
    }

    let (status, _) = call(
        &router,
        "POST",
        &format!("/api/v1/ballots/{ballot_id}/votes"),
        Some(&voters[0]),
        Some(json!({ "choice": "Oppose" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, tally) = call(
        &router,
        "GET",
        &format!("/api/v1/ballots/{ballot_id}/tally"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["total_votes"], 3);
    assert_eq!(tally["leader"], "Support");
    assert_eq!(tally["options"][0], json!({ "option": "Support", "votes": 2 }));
}

#[tokio::test]
async fn alerts_budget_and_council_through_gateway() {
    let router = full_gateway().await;
    let subscriber = register(&router, "Dee", "North End").await;

    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/subscriptions",
        Some(&subscriber),
        Some(json!({ "channel": "email" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, report) = call(
        &router,
        "POST",
        "/api/v1/alerts",
        Some(STAFF_TOKEN),
        Some(json!({ "message": "Boil water advisory", "neighborhood": "north end" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(report["delivered"], 1);

    let (_, alerts) = call(
        &router,
        "GET",
        "/api/v1/alerts?neighborhood=north-end",
        None,
        None,
    )
    .await;
    assert_eq!(alerts.as_array().map(Vec::len), Some(1));

    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/budget/items",
        Some(STAFF_TOKEN),
        Some(json!({
            "fiscal_year": 2026,
            "department": "Fire",
            "description": "Ladder truck replacement",
            "amount_cents": 145_000_000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, summary) = call(
        &router,
        "GET",
        "/api/v1/budget/summary?fiscal_year=2026",
        None,
        None,
    )
    .await;
    assert_eq!(summary["total_cents"], 145_000_000);

    let (status, meeting) = call(
        &router,
        "POST",
        "/api/v1/council/meetings",
        Some(STAFF_TOKEN),
        Some(json!({
            "title": "Regular meeting",
            "body": "City Council",
            "location": "City Hall",
            "scheduled_at": "2099-01-07T23:30:00Z",
            "agenda": ["Approval of minutes", " "]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(meeting["agenda"], json!(["Approval of minutes"]));

    let (_, upcoming) = call(
        &router,
        "GET",
        "/api/v1/council/meetings?upcoming=true",
        None,
        None,
    )
    .await;
    assert_eq!(upcoming[0]["id"], meeting["id"]);
}
