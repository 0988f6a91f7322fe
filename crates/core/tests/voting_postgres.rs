//! Voting engine tests against `PostgreSQL`.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test voting_postgres -- --ignored`
//!
//! Connection settings follow the `TEST_DB_*` variables of
//! `sharehub_db::test_utils`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use sharehub_common::{AuthorDeletionPolicy, VotingConfig};
use sharehub_core::{
    CallerIdentity, DbVoteLedger, ImpactPolicy, Role, Votable, VotableRegistry, VotingAggregate,
    VotingService,
};
use sharehub_db::{
    repositories::{CommentRepository, UploadRepository, UserRepository, VoteRepository},
    test_utils::TestDatabase,
};

struct Engine {
    db: TestDatabase,
    voting: VotingService,
    uploads: UploadRepository,
}

async fn engine(config: &VotingConfig) -> Engine {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();

    let conn = db.connection();
    let uploads = UploadRepository::new(Arc::clone(&conn));
    let comments = CommentRepository::new(Arc::clone(&conn));
    let registry = VotableRegistry::builder()
        .register(
            Arc::new(uploads.clone()),
            ImpactPolicy::from_range(&config.upload_impact),
        )
        .unwrap()
        .register(
            Arc::new(comments),
            ImpactPolicy::from_range(&config.comment_impact),
        )
        .unwrap()
        .build();
    let voting = VotingService::with_config(
        Arc::new(DbVoteLedger::new(VoteRepository::new(conn))),
        registry,
        config,
    );

    Engine {
        db,
        voting,
        uploads,
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_two_user_scenario() {
    let e = engine(&VotingConfig::default()).await;
    let alice = CallerIdentity::new(e.db.seed_user("alice").await.unwrap().id, Role::User);
    let bob = CallerIdentity::new(e.db.seed_user("bob").await.unwrap().id, Role::User);
    let owner = e.db.seed_user("owner").await.unwrap();
    let upload = e.db.seed_upload(&owner.id, "Shared file").await.unwrap();

    upload.upvote(&e.voting, &alice).await.unwrap();
    let bob_vote = upload.upvote(&e.voting, &bob).await.unwrap();
    upload.downvote(&e.voting, &alice).await.unwrap();
    assert_eq!(
        e.uploads.get_by_id(&upload.id).await.unwrap().voting(),
        VotingAggregate::new(0, 2)
    );

    e.voting.retract_vote(&bob_vote.vote.id).await.unwrap();
    let reloaded = e.uploads.get_by_id(&upload.id).await.unwrap();
    assert_eq!(reloaded.voting(), VotingAggregate::new(-1, 1));
    assert_eq!(reloaded.updated_at, upload.updated_at);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_repair_matches_live_aggregate() {
    let e = engine(&VotingConfig::default()).await;
    let voter = CallerIdentity::new(e.db.seed_user("voter").await.unwrap().id, Role::User);
    let owner = e.db.seed_user("owner").await.unwrap();
    let upload = e.db.seed_upload(&owner.id, "File").await.unwrap();

    upload.vote(&e.voting, &voter, -1).await.unwrap();
    e.uploads.set_voting(&upload.id, 40, 7).await.unwrap();

    let repaired = e.voting.repair_aggregate(&upload.target()).await.unwrap();
    assert_eq!(repaired, VotingAggregate::new(-1, 1));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_retract_policy_on_account_deletion() {
    let config = VotingConfig {
        author_deletion: AuthorDeletionPolicy::Retract,
        ..VotingConfig::default()
    };
    let e = engine(&config).await;
    let leaving = e.db.seed_user("leaving").await.unwrap();
    let owner = e.db.seed_user("owner").await.unwrap();
    let upload = e.db.seed_upload(&owner.id, "File").await.unwrap();

    upload
        .upvote(&e.voting, &CallerIdentity::from(&leaving))
        .await
        .unwrap();
    e.voting.handle_author_deleted(&leaving.id).await.unwrap();
    let users = UserRepository::new(e.db.connection());
    users.delete(&leaving.id).await.unwrap();

    assert_eq!(
        e.uploads.get_by_id(&upload.id).await.unwrap().voting(),
        VotingAggregate::default()
    );
    assert!(
        e.voting
            .votes_of(&upload.target(), 10, None)
            .await
            .unwrap()
            .is_empty()
    );
}
