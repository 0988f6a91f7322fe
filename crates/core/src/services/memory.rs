//! In-memory ledger and votable stores for tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use sharehub_common::{AppError, AppResult};
use sharehub_db::entities::vote::{self, TargetRef};

use super::ledger::VoteLedger;
use super::votable::{VotableStore, VotingAggregate, VotingDelta};

fn lock<T>(mutex: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
}

/// Vote ledger kept in a map, enforcing the (author, target) key.
#[derive(Default)]
pub struct InMemoryVoteLedger {
    votes: Mutex<HashMap<String, vote::Model>>,
    seq: AtomicU64,
    failing_creates: AtomicU32,
}

impl InMemoryVoteLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` creates fail with [`AppError::Conflict`].
    pub fn fail_next_creates(&self, n: u32) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    /// Insert a vote directly, bypassing the uniqueness check.
    pub fn insert_raw(&self, author: Option<&str>, target: &TargetRef, impact: i32) -> AppResult<vote::Model> {
        let model = self.build(author, target, impact);
        lock(&self.votes)?.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    /// Number of live votes.
    pub fn len(&self) -> AppResult<usize> {
        Ok(lock(&self.votes)?.len())
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    fn build(&self, author: Option<&str>, target: &TargetRef, impact: i32) -> vote::Model {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        vote::Model {
            id: format!("v{seq:025}"),
            user_id: author.map(str::to_string),
            target_type: target.target_type.clone(),
            target_id: target.target_id.clone(),
            impact,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn take_failure(&self) -> bool {
        self.failing_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn newest_first(mut votes: Vec<vote::Model>, limit: u64, until_id: Option<&str>) -> Vec<vote::Model> {
    votes.sort_by(|a, b| b.id.cmp(&a.id));
    votes
        .into_iter()
        .filter(|v| until_id.is_none_or(|until| v.id.as_str() < until))
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl VoteLedger for InMemoryVoteLedger {
    async fn find_vote(&self, author: &str, target: &TargetRef) -> AppResult<Option<vote::Model>> {
        Ok(lock(&self.votes)?
            .values()
            .find(|v| v.user_id.as_deref() == Some(author) && v.target() == *target)
            .cloned())
    }

    async fn get_vote(&self, vote_id: &str) -> AppResult<Option<vote::Model>> {
        Ok(lock(&self.votes)?.get(vote_id).cloned())
    }

    async fn create_vote(
        &self,
        author: &str,
        target: &TargetRef,
        impact: i32,
    ) -> AppResult<vote::Model> {
        if self.take_failure() {
            return Err(AppError::Conflict(format!("injected conflict on {target}")));
        }

        let mut votes = lock(&self.votes)?;
        if votes
            .values()
            .any(|v| v.user_id.as_deref() == Some(author) && v.target() == *target)
        {
            return Err(AppError::Conflict(format!(
                "duplicate vote of {author} on {target}"
            )));
        }

        let model = self.build(Some(author), target, impact);
        votes.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    async fn remove_vote(&self, vote_id: &str) -> AppResult<()> {
        lock(&self.votes)?
            .remove(vote_id)
            .map(|_| ())
            .ok_or_else(|| AppError::VoteNotFound(vote_id.to_string()))
    }

    async fn list_votes_for_target(&self, target: &TargetRef) -> AppResult<Vec<vote::Model>> {
        let mut votes: Vec<_> = lock(&self.votes)?
            .values()
            .filter(|v| v.target() == *target)
            .cloned()
            .collect();
        votes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(votes)
    }

    async fn list_votes_for_target_paged(
        &self,
        target: &TargetRef,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let votes = self.list_votes_for_target(target).await?;
        Ok(newest_first(votes, limit, until_id))
    }

    async fn list_votes_by_author(
        &self,
        author: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let votes: Vec<_> = lock(&self.votes)?
            .values()
            .filter(|v| v.user_id.as_deref() == Some(author))
            .cloned()
            .collect();
        Ok(newest_first(votes, limit, until_id))
    }

    async fn remove_votes_for_target(&self, target: &TargetRef) -> AppResult<u64> {
        let mut votes = lock(&self.votes)?;
        let before = votes.len();
        votes.retain(|_, v| v.target() != *target);
        Ok((before - votes.len()) as u64)
    }

    async fn anonymize_votes_by_author(&self, author: &str) -> AppResult<u64> {
        let mut count = 0;
        for v in lock(&self.votes)?.values_mut() {
            if v.user_id.as_deref() == Some(author) {
                v.user_id = None;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Votable store holding aggregates in a map.
pub struct InMemoryVotableStore {
    type_tag: String,
    aggregates: Mutex<HashMap<String, VotingAggregate>>,
    failing_deltas: AtomicU32,
    vanish_on_next_delta: AtomicBool,
}

impl InMemoryVotableStore {
    /// Create an empty store for `type_tag`.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            aggregates: Mutex::new(HashMap::new()),
            failing_deltas: AtomicU32::new(0),
            vanish_on_next_delta: AtomicBool::new(false),
        }
    }

    /// Add an entity with an empty aggregate.
    pub fn insert(&self, id: &str) -> AppResult<()> {
        lock(&self.aggregates)?.insert(id.to_string(), VotingAggregate::default());
        Ok(())
    }

    /// Delete an entity.
    pub fn remove(&self, id: &str) -> AppResult<()> {
        lock(&self.aggregates)?.remove(id);
        Ok(())
    }

    /// Current aggregate of an entity.
    pub fn aggregate(&self, id: &str) -> AppResult<Option<VotingAggregate>> {
        Ok(lock(&self.aggregates)?.get(id).copied())
    }

    /// Make the next `n` deltas fail with [`AppError::Database`].
    pub fn fail_next_deltas(&self, n: u32) {
        self.failing_deltas.store(n, Ordering::SeqCst);
    }

    /// Delete the entity targeted by the next delta right before applying it.
    pub fn vanish_on_next_delta(&self) {
        self.vanish_on_next_delta.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VotableStore for InMemoryVotableStore {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    async fn resolve(&self, id: &str) -> AppResult<Option<VotingAggregate>> {
        self.aggregate(id)
    }

    async fn apply_delta(&self, id: &str, delta: VotingDelta) -> AppResult<bool> {
        if self
            .failing_deltas
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Database("injected delta failure".to_string()));
        }

        let mut aggregates = lock(&self.aggregates)?;
        if self.vanish_on_next_delta.swap(false, Ordering::SeqCst) {
            aggregates.remove(id);
        }

        Ok(match aggregates.get_mut(id) {
            Some(aggregate) => {
                *aggregate = aggregate.apply(delta);
                true
            }
            None => false,
        })
    }

    async fn overwrite(&self, id: &str, aggregate: VotingAggregate) -> AppResult<bool> {
        Ok(match lock(&self.aggregates)?.get_mut(id) {
            Some(current) => {
                *current = aggregate;
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ledger_enforces_author_target_key() {
        let ledger = InMemoryVoteLedger::new();
        let target = TargetRef::new("upload", "u1");

        ledger.create_vote("alice", &target, 1).await.unwrap();
        let second = ledger.create_vote("alice", &target, -1).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_anonymized_votes_do_not_block_new_votes() {
        let ledger = InMemoryVoteLedger::new();
        let target = TargetRef::new("upload", "u1");

        ledger.create_vote("alice", &target, 1).await.unwrap();
        assert_eq!(ledger.anonymize_votes_by_author("alice").await.unwrap(), 1);

        assert!(ledger.find_vote("alice", &target).await.unwrap().is_none());
        assert!(ledger.create_vote("alice", &target, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_paged_listing_newest_first() {
        let ledger = InMemoryVoteLedger::new();
        let target = TargetRef::new("comment", "c1");
        let first = ledger.create_vote("a", &target, 1).await.unwrap();
        let second = ledger.create_vote("b", &target, 1).await.unwrap();
        let third = ledger.create_vote("c", &target, -1).await.unwrap();

        let page = ledger
            .list_votes_for_target_paged(&target, 2, None)
            .await
            .unwrap();
        assert_eq!(page.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(), [
            third.id.as_str(),
            second.id.as_str()
        ]);

        let next = ledger
            .list_votes_for_target_paged(&target, 2, Some(&second.id))
            .await
            .unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, first.id);
    }

    #[tokio::test]
    async fn test_store_delta_on_missing_entity() {
        let store = InMemoryVotableStore::new("upload");
        assert!(!store.apply_delta("nope", VotingDelta::cast(1)).await.unwrap());

        store.insert("u1").unwrap();
        assert!(store.apply_delta("u1", VotingDelta::cast(-1)).await.unwrap());
        assert_eq!(store.aggregate("u1").unwrap(), Some(VotingAggregate::new(-1, 1)));
    }
}
