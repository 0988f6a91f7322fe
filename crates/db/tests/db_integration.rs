//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `sharehub_test`)
//!   `TEST_DB_PASSWORD` (default: `sharehub_test`)
//!   `TEST_DB_NAME` (default: `sharehub_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Set;
use sharehub_common::AppError;
use sharehub_db::{
    entities::vote::{self, TargetRef},
    repositories::{UploadRepository, UserRepository, VoteRepository},
    test_utils::{TestDatabase, TestDbConfig},
};

fn new_vote(id: &str, user_id: &str, target: &TargetRef, impact: i32) -> vote::ActiveModel {
    vote::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(Some(user_id.to_string())),
        target_type: Set(target.target_type.clone()),
        target_id: Set(target.target_id.clone()),
        impact: Set(impact),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_vote_is_a_conflict() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();

    let user = db.seed_user("alice").await.unwrap();
    let upload = db.seed_upload(&user.id, "First file").await.unwrap();
    let target = TargetRef::new("upload", &upload.id);

    let votes = VoteRepository::new(db.connection());
    votes
        .create(new_vote("vote_a", &user.id, &target, 1))
        .await
        .unwrap();

    let duplicate = votes
        .create(new_vote("vote_b", &user.id, &target, -1))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_voting_delta_keeps_updated_at() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();

    let user = db.seed_user("bob").await.unwrap();
    let upload = db.seed_upload(&user.id, "Second file").await.unwrap();

    let uploads = UploadRepository::new(db.connection());
    assert!(uploads.apply_voting_delta(&upload.id, -1, 1).await.unwrap());

    let reloaded = uploads.get_by_id(&upload.id).await.unwrap();
    assert_eq!(reloaded.voting_sum, -1);
    assert_eq!(reloaded.voting_count, 1);
    assert_eq!(reloaded.updated_at, upload.updated_at);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_author_anonymizes_votes() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();

    let owner = db.seed_user("carol").await.unwrap();
    let voter = db.seed_user("dave").await.unwrap();
    let upload = db.seed_upload(&owner.id, "Third file").await.unwrap();
    let target = TargetRef::new("upload", &upload.id);

    let conn = db.connection();
    let votes = VoteRepository::new(Arc::clone(&conn));
    votes
        .create(new_vote("vote_c", &voter.id, &target, 1))
        .await
        .unwrap();

    UserRepository::new(conn).delete(&voter.id).await.unwrap();

    let remaining = votes.find_all_by_target(&target).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].user_id.is_none());
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
}
