//! API integration tests.
//!
//! Voting runs against the in-memory ledger and votable stores; token
//! lookups are served by a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{Value, json};
use sharehub_api::{AppState, middleware::auth_middleware, router as api_router};
use sharehub_core::{
    CommentService, ImpactPolicy, InMemoryVotableStore, InMemoryVoteLedger, UploadService,
    UserService, VotableRegistry, VotingAggregate, VotingService,
};
use sharehub_db::{
    entities::{comment, upload, user},
    repositories::{CommentRepository, UploadRepository, UserRepository},
};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

struct TestApp {
    router: Router,
    ledger: Arc<InMemoryVoteLedger>,
    uploads: Arc<InMemoryVotableStore>,
    comments: Arc<InMemoryVotableStore>,
}

fn test_user(id: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: format!("user_{id}"),
        token: Some(TOKEN.to_string()),
        is_admin: false,
        is_moderator: false,
        created_at: Utc::now().into(),
    }
}

fn test_upload(id: &str) -> upload::Model {
    upload::Model {
        id: id.to_string(),
        slug: format!("file-{id}"),
        title: "File".to_string(),
        description: String::new(),
        user_id: "owner".to_string(),
        voting_sum: 0,
        voting_count: 0,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn test_comment(id: &str) -> comment::Model {
    comment::Model {
        id: id.to_string(),
        upload_id: "u1".to_string(),
        user_id: "owner".to_string(),
        body: "Nice".to_string(),
        voting_sum: 0,
        voting_count: 0,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

/// Mock database answering one token lookup per authenticated request.
fn mock_db_with_logins(users: &[&str]) -> MockDatabase {
    users.iter().fold(MockDatabase::new(DatabaseBackend::Postgres), |db, id| {
        db.append_query_results([[test_user(id)]])
    })
}

fn create_test_app(db: MockDatabase) -> TestApp {
    let db = Arc::new(db.into_connection());

    let ledger = Arc::new(InMemoryVoteLedger::new());
    let uploads = Arc::new(InMemoryVotableStore::new("upload"));
    let comments = Arc::new(InMemoryVotableStore::new("comment"));
    uploads.insert("u1").unwrap();
    comments.insert("c1").unwrap();

    let registry = VotableRegistry::builder()
        .register(
            uploads.clone(),
            ImpactPolicy::new(
                |i| i != 0 && (-1..=1).contains(&i),
                "Vote must be between -1 and 1",
            ),
        )
        .unwrap()
        .register(comments.clone(), ImpactPolicy::unit())
        .unwrap()
        .build();
    let voting_service = VotingService::new(ledger.clone(), registry);

    let user_repo = UserRepository::new(Arc::clone(&db));
    let upload_repo = UploadRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));

    let state = AppState {
        user_service: UserService::new(
            user_repo,
            upload_repo.clone(),
            comment_repo.clone(),
            voting_service.clone(),
        ),
        upload_service: UploadService::new(
            upload_repo.clone(),
            comment_repo.clone(),
            voting_service.clone(),
        ),
        comment_service: CommentService::new(comment_repo, upload_repo, voting_service.clone()),
        voting_service,
    };

    let router = api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    TestApp {
        router,
        ledger,
        uploads,
        comments,
    }
}

fn request(method: &str, uri: &str, body: Value, authenticated: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if authenticated {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_submit_vote_requires_authentication() {
    let app = create_test_app(MockDatabase::new(DatabaseBackend::Postgres));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "upload", "targetId": "u1", "impact": 1 }),
            false,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(app.ledger.is_empty().unwrap());
}

#[tokio::test]
async fn test_submit_vote_updates_aggregate() {
    let app = create_test_app(mock_db_with_logins(&["alice"]));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "upload", "targetId": "u1", "impact": -1 }),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["vote"]["impact"], -1);
    assert_eq!(body["data"]["vote"]["userId"], "alice");
    assert_eq!(body["data"]["aggregate"], json!({ "sum": -1, "count": 1 }));
    assert_eq!(
        app.uploads.aggregate("u1").unwrap(),
        Some(VotingAggregate::new(-1, 1))
    );
}

#[tokio::test]
async fn test_invalid_impact_is_client_error() {
    let app = create_test_app(
        mock_db_with_logins(&["alice"]).append_query_results([[test_comment("c1")]]),
    );

    let (status, body) = send(
        &app,
        request("PUT", "/comments/c1/vote", json!({ "impact": 2 }), true),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_IMPACT");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Vote must be +/- 1")
    );
    assert!(app.ledger.is_empty().unwrap());
    assert_eq!(
        app.comments.aggregate("c1").unwrap(),
        Some(VotingAggregate::default())
    );
}

#[tokio::test]
async fn test_per_entity_vote_route() {
    // Token lookup then upload lookup, per request
    let app = create_test_app(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("alice")]])
            .append_query_results([[test_upload("u1")]])
            .append_query_results([[test_user("alice")]])
            .append_query_results([[test_upload("u1")]]),
    );

    let (status, _) = send(
        &app,
        request("PUT", "/uploads/u1/vote", json!({ "impact": 1 }), true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request("PUT", "/uploads/u1/vote", json!({ "impact": 1 }), true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["aggregate"], json!({ "sum": 1, "count": 1 }));
    assert_eq!(app.ledger.len().unwrap(), 1);
}

#[tokio::test]
async fn test_per_entity_vote_requires_authentication() {
    let app = create_test_app(MockDatabase::new(DatabaseBackend::Postgres));

    let (status, body) = send(
        &app,
        request("PUT", "/comments/c1/vote", json!({ "impact": 1 }), false),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(app.ledger.is_empty().unwrap());
}

#[tokio::test]
async fn test_per_entity_vote_on_missing_upload() {
    let app = create_test_app(
        mock_db_with_logins(&["alice"]).append_query_results([Vec::<upload::Model>::new()]),
    );

    let (status, _) = send(
        &app,
        request("PUT", "/uploads/gone/vote", json!({ "impact": 1 }), true),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.ledger.is_empty().unwrap());
}

#[tokio::test]
async fn test_unknown_target_type_is_server_error() {
    let app = create_test_app(mock_db_with_logins(&["alice"]));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "tag", "targetId": "t1", "impact": 1 }),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "UNKNOWN_TARGET_TYPE");
}

#[tokio::test]
async fn test_missing_target_is_not_found() {
    let app = create_test_app(mock_db_with_logins(&["alice"]));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "comment", "targetId": "gone", "impact": 1 }),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TARGET_NOT_FOUND");
}

#[tokio::test]
async fn test_empty_target_type_fails_validation() {
    let app = create_test_app(mock_db_with_logins(&["alice"]));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "", "targetId": "u1", "impact": 1 }),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_retract_own_vote() {
    let app = create_test_app(mock_db_with_logins(&["alice", "alice", "alice"]));
    let target = json!({ "targetType": "upload", "targetId": "u1" });

    let (status, body) = send(&app, request("POST", "/votes/retract", target.clone(), true)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "VOTE_NOT_FOUND");

    send(
        &app,
        request(
            "POST",
            "/votes/submit",
            json!({ "targetType": "upload", "targetId": "u1", "impact": 1 }),
            true,
        ),
    )
    .await;

    let (status, _) = send(&app, request("POST", "/votes/retract", target, true)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.uploads.aggregate("u1").unwrap(),
        Some(VotingAggregate::default())
    );
}

#[tokio::test]
async fn test_public_read_endpoints() {
    let app = create_test_app(mock_db_with_logins(&["alice", "bob"]));

    for _ in 0..2 {
        send(
            &app,
            request(
                "POST",
                "/votes/submit",
                json!({ "targetType": "upload", "targetId": "u1", "impact": 1 }),
                true,
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/aggregate",
            json!({ "targetType": "upload", "targetId": "u1" }),
            false,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "sum": 2, "count": 2 }));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/votes/list",
            json!({ "targetType": "upload", "targetId": "u1", "limit": 1 }),
            false,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let votes = body["data"].as_array().unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0]["userId"], "bob");
}
