//! Vote reconciliation.
//!
//! [`VotingService`] is the only place that writes both the vote ledger and
//! the denormalized aggregates, keeping `sum`/`count` of every target equal
//! to the impacts of its live votes.

use serde::Serialize;
use sharehub_common::{AppError, AppResult, AuthorDeletionPolicy, VotingConfig};
use sharehub_db::entities::vote::{self, TargetRef};
use tracing::{debug, error, info, warn};

use super::identity::CallerIdentity;
use super::ledger::SharedVoteLedger;
use super::registry::VotableRegistry;
use super::votable::{VotableStore, VotingAggregate, VotingDelta};

/// Votes fetched per round when retracting all votes of an author.
const AUTHOR_RETRACT_BATCH: u64 = 100;

/// Attempts for a compensating delta before the target is reported for repair.
const COMPENSATION_ATTEMPTS: u32 = 2;

/// Outcome of a successful vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    /// The live vote.
    pub vote: vote::Model,
    /// Aggregate of the target after the vote, if it could be read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<VotingAggregate>,
}

/// Voting service for business logic.
#[derive(Clone)]
pub struct VotingService {
    ledger: SharedVoteLedger,
    registry: VotableRegistry,
    conflict_retries: u32,
    author_deletion: AuthorDeletionPolicy,
}

impl VotingService {
    /// Create a voting service with default settings.
    #[must_use]
    pub fn new(ledger: SharedVoteLedger, registry: VotableRegistry) -> Self {
        Self::with_config(ledger, registry, &VotingConfig::default())
    }

    /// Create a voting service from configuration.
    #[must_use]
    pub fn with_config(
        ledger: SharedVoteLedger,
        registry: VotableRegistry,
        config: &VotingConfig,
    ) -> Self {
        Self {
            ledger,
            registry,
            conflict_retries: config.conflict_retries,
            author_deletion: config.author_deletion,
        }
    }

    /// Entry point for the endpoint layer.
    ///
    /// Requires a resolved caller; anonymous submissions are rejected.
    pub async fn submit_vote(
        &self,
        caller: Option<&CallerIdentity>,
        target_type: &str,
        target_id: &str,
        impact: i32,
    ) -> AppResult<VoteResult> {
        let caller = caller.ok_or(AppError::Unauthorized)?;
        self.cast_vote(&TargetRef::new(target_type, target_id), &caller.user_id, impact)
            .await
    }

    /// Cast a vote, replacing any previous vote of `author` on `target`.
    pub async fn cast_vote(
        &self,
        target: &TargetRef,
        author: &str,
        impact: i32,
    ) -> AppResult<VoteResult> {
        let registration = self.registry.get(&target.target_type)?;
        registration.policy.check(impact)?;
        let store = registration.store.as_ref();

        if store.resolve(&target.target_id).await?.is_none() {
            warn!(target_type = %target.target_type, target_id = %target.target_id, "Vote target not found");
            return Err(AppError::TargetNotFound(target.to_string()));
        }

        let mut conflicts = 0;
        let vote = loop {
            if let Some(existing) = self.ledger.find_vote(author, target).await? {
                self.undo(store, &existing).await?;
            }

            match self.ledger.create_vote(author, target, impact).await {
                Ok(vote) => break vote,
                Err(AppError::Conflict(detail)) => {
                    warn!(
                        target_type = %target.target_type,
                        target_id = %target.target_id,
                        author = %author,
                        attempt = conflicts + 1,
                        "Vote replaced concurrently: {detail}"
                    );
                    if conflicts >= self.conflict_retries {
                        return Err(AppError::Unavailable(format!(
                            "Concurrent votes on {target}, try again"
                        )));
                    }
                    conflicts += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let delta = VotingDelta::cast(impact);
        match store.apply_delta(&target.target_id, delta).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(target_type = %target.target_type, target_id = %target.target_id, "Vote target vanished, discarding vote");
                self.discard(&vote, delta).await;
                return Err(AppError::TargetNotFound(target.to_string()));
            }
            Err(e) => {
                self.discard(&vote, delta).await;
                return Err(e);
            }
        }

        debug!(
            vote_id = %vote.id,
            target_type = %target.target_type,
            target_id = %target.target_id,
            impact,
            "Vote cast"
        );

        let aggregate = store.resolve(&target.target_id).await?;
        Ok(VoteResult { vote, aggregate })
    }

    /// Retract a vote by ID, compensating its target's aggregate.
    pub async fn retract_vote(&self, vote_id: &str) -> AppResult<vote::Model> {
        let vote = self
            .ledger
            .get_vote(vote_id)
            .await?
            .ok_or_else(|| AppError::VoteNotFound(vote_id.to_string()))?;
        let registration = self.registry.get(&vote.target_type)?;

        if !self.undo(registration.store.as_ref(), &vote).await? {
            return Err(AppError::VoteNotFound(vote_id.to_string()));
        }

        debug!(vote_id = %vote.id, vote_target = %vote.target(), "Vote retracted");
        Ok(vote)
    }

    /// Retract the vote of `author` on `target`.
    pub async fn retract_own_vote(&self, author: &str, target: &TargetRef) -> AppResult<vote::Model> {
        let registration = self.registry.get(&target.target_type)?;
        let not_found = || AppError::VoteNotFound(format!("No vote of {author} on {target}"));

        let vote = self
            .ledger
            .find_vote(author, target)
            .await?
            .ok_or_else(not_found)?;

        if !self.undo(registration.store.as_ref(), &vote).await? {
            return Err(not_found());
        }

        debug!(vote_id = %vote.id, vote_target = %target, "Vote retracted");
        Ok(vote)
    }

    /// Delete all votes on a target that is being deleted.
    ///
    /// The aggregate is not adjusted since the target goes away.
    pub async fn purge_target(&self, target: &TargetRef) -> AppResult<u64> {
        let removed = self.ledger.remove_votes_for_target(target).await?;
        if removed > 0 {
            info!(vote_target = %target, removed, "Purged votes of deleted target");
        }
        Ok(removed)
    }

    /// Apply the author-deletion policy before an account is removed.
    pub async fn handle_author_deleted(&self, author: &str) -> AppResult<u64> {
        match self.author_deletion {
            AuthorDeletionPolicy::Anonymize => {
                let anonymized = self.ledger.anonymize_votes_by_author(author).await?;
                info!(author = %author, anonymized, "Anonymized votes of deleted account");
                Ok(anonymized)
            }
            AuthorDeletionPolicy::Retract => {
                let mut retracted = 0;
                loop {
                    let batch = self
                        .ledger
                        .list_votes_by_author(author, AUTHOR_RETRACT_BATCH, None)
                        .await?;
                    if batch.is_empty() {
                        break;
                    }

                    for vote in &batch {
                        let registration = self.registry.get(&vote.target_type)?;
                        if self.undo(registration.store.as_ref(), vote).await? {
                            retracted += 1;
                        }
                    }
                }
                info!(author = %author, retracted, "Retracted votes of deleted account");
                Ok(retracted)
            }
        }
    }

    /// The live vote of `author` on `target`, if any.
    pub async fn current_vote(
        &self,
        author: &str,
        target: &TargetRef,
    ) -> AppResult<Option<vote::Model>> {
        self.ledger.find_vote(author, target).await
    }

    /// Whether `author` has a live vote on `target`.
    pub async fn has_voted(&self, author: &str, target: &TargetRef) -> AppResult<bool> {
        Ok(self.current_vote(author, target).await?.is_some())
    }

    /// Votes on a target (paginated, newest first).
    pub async fn votes_of(
        &self,
        target: &TargetRef,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.registry.get(&target.target_type)?;
        self.ledger
            .list_votes_for_target_paged(target, limit, until_id)
            .await
    }

    /// Votes by an author (paginated, newest first).
    pub async fn votes_by(
        &self,
        author: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        self.ledger.list_votes_by_author(author, limit, until_id).await
    }

    /// Current aggregate of a target.
    pub async fn aggregate_of(&self, target: &TargetRef) -> AppResult<VotingAggregate> {
        self.registry
            .get(&target.target_type)?
            .store
            .resolve(&target.target_id)
            .await?
            .ok_or_else(|| AppError::TargetNotFound(target.to_string()))
    }

    /// Recompute a target's aggregate from the ledger and overwrite it.
    pub async fn repair_aggregate(&self, target: &TargetRef) -> AppResult<VotingAggregate> {
        let store = self.registry.get(&target.target_type)?.store.as_ref();
        let votes = self.ledger.list_votes_for_target(target).await?;
        let aggregate = VotingAggregate::from_impacts(votes.iter().map(|v| v.impact));

        if !store.overwrite(&target.target_id, aggregate).await? {
            return Err(AppError::TargetNotFound(target.to_string()));
        }

        info!(vote_target = %target, sum = aggregate.sum, count = aggregate.count, "Repaired vote aggregate");
        Ok(aggregate)
    }

    /// Remove a vote from the ledger, then compensate its aggregate.
    ///
    /// Returns `false` if the vote was already gone, in which case whoever
    /// removed it owns the compensation.
    async fn undo(&self, store: &dyn VotableStore, vote: &vote::Model) -> AppResult<bool> {
        match self.ledger.remove_vote(&vote.id).await {
            Ok(()) => {}
            Err(AppError::VoteNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        }

        let delta = VotingDelta::undo(vote.impact);
        let mut attempt = 1;
        loop {
            match store.apply_delta(&vote.target_id, delta).await {
                Ok(true) => return Ok(true),
                Ok(false) => {
                    warn!(vote_target = %vote.target(), vote_id = %vote.id, "Vote target gone, nothing to compensate");
                    return Ok(true);
                }
                Err(e) if attempt < COMPENSATION_ATTEMPTS => {
                    warn!(vote_target = %vote.target(), attempt, "Retrying vote compensation: {e}");
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        target_type = %vote.target_type,
                        target_id = %vote.target_id,
                        vote_id = %vote.id,
                        delta = %delta,
                        "Vote removed but aggregate not compensated, target requires repair: {e}"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Roll back a freshly created vote whose increment was not applied.
    async fn discard(&self, vote: &vote::Model, delta: VotingDelta) {
        if let Err(e) = self.ledger.remove_vote(&vote.id).await {
            error!(
                target_type = %vote.target_type,
                target_id = %vote.target_id,
                vote_id = %vote.id,
                delta = %delta,
                "Vote recorded without aggregate increment, target requires repair: {e}"
            );
        }
    }
}
