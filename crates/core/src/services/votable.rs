//! Votable capability.
//!
//! An entity type takes part in voting by carrying a `{sum, count}`
//! aggregate, implementing [`Votable`] on its model and registering a
//! [`VotableStore`] together with an [`ImpactPolicy`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sharehub_common::{AppError, AppResult, ImpactRangeConfig};
use sharehub_db::entities::vote::TargetRef;

use super::identity::CallerIdentity;
use super::voting::{VoteResult, VotingService};

/// Denormalized vote aggregate of a votable entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingAggregate {
    /// Sum of the impacts of all live votes.
    pub sum: i64,
    /// Number of live votes.
    pub count: i64,
}

impl VotingAggregate {
    /// Create an aggregate.
    #[must_use]
    pub const fn new(sum: i64, count: i64) -> Self {
        Self { sum, count }
    }

    /// Aggregate of a set of impacts.
    pub fn from_impacts(impacts: impl IntoIterator<Item = i32>) -> Self {
        impacts
            .into_iter()
            .fold(Self::default(), |acc, impact| acc.apply(VotingDelta::cast(impact)))
    }

    /// The aggregate after `delta`.
    #[must_use]
    pub const fn apply(self, delta: VotingDelta) -> Self {
        Self {
            sum: self.sum + delta.sum,
            count: self.count + delta.count,
        }
    }
}

/// Field-level increment applied atomically to an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingDelta {
    /// Change of `sum`.
    pub sum: i64,
    /// Change of `count`.
    pub count: i64,
}

impl VotingDelta {
    /// Delta of adding a vote.
    #[must_use]
    pub const fn cast(impact: i32) -> Self {
        Self {
            sum: impact as i64,
            count: 1,
        }
    }

    /// Delta of removing a vote.
    #[must_use]
    pub const fn undo(impact: i32) -> Self {
        Self {
            sum: -(impact as i64),
            count: -1,
        }
    }
}

impl fmt::Display for VotingDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sum{:+} count{:+}", self.sum, self.count)
    }
}

/// Predicate over impact values, fixed per entity type at registration.
#[derive(Clone)]
pub struct ImpactPolicy {
    predicate: Arc<dyn Fn(i32) -> bool + Send + Sync>,
    message: String,
}

impl ImpactPolicy {
    /// Create a policy from a predicate and its rejection message.
    pub fn new(
        predicate: impl Fn(i32) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    /// Accept exactly -1 and +1.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(|impact| impact == 1 || impact == -1, "Vote must be +/- 1")
    }

    /// Accept every impact.
    #[must_use]
    pub fn any() -> Self {
        Self::new(|_| true, "")
    }

    /// Build a policy from a configured range.
    #[must_use]
    pub fn from_range(range: &ImpactRangeConfig) -> Self {
        let range_copy = range.clone();
        Self::new(
            move |impact| range_copy.accepts(impact),
            range.rejection_message(),
        )
    }

    /// Whether `impact` is accepted.
    #[must_use]
    pub fn accepts(&self, impact: i32) -> bool {
        (self.predicate)(impact)
    }

    /// The rejection message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fail with [`AppError::InvalidImpact`] if `impact` is rejected.
    pub fn check(&self, impact: i32) -> AppResult<()> {
        if self.accepts(impact) {
            Ok(())
        } else {
            Err(AppError::InvalidImpact(self.message.clone()))
        }
    }
}

impl fmt::Debug for ImpactPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpactPolicy")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Generic access to the aggregates of one votable entity type.
#[async_trait]
pub trait VotableStore: Send + Sync {
    /// Type tag the store is registered under.
    fn type_tag(&self) -> &str;

    /// Current aggregate of an entity, or `None` if it does not exist.
    async fn resolve(&self, id: &str) -> AppResult<Option<VotingAggregate>>;

    /// Apply `delta` as a single atomic increment.
    ///
    /// Must leave the entity's modification timestamp untouched. Returns
    /// `false` if the entity does not exist.
    async fn apply_delta(&self, id: &str, delta: VotingDelta) -> AppResult<bool>;

    /// Overwrite the aggregate. Only used for repair.
    async fn overwrite(&self, id: &str, aggregate: VotingAggregate) -> AppResult<bool>;
}

/// Voting on an entity instance.
#[allow(async_fn_in_trait)]
pub trait Votable {
    /// Type tag of the entity.
    const TYPE_TAG: &'static str;

    /// Entity ID.
    fn id(&self) -> &str;

    /// Aggregate as loaded with the entity.
    fn voting(&self) -> VotingAggregate;

    /// Reference to this entity.
    fn target(&self) -> TargetRef {
        TargetRef::new(Self::TYPE_TAG, self.id())
    }

    /// Cast (or replace) the caller's vote on this entity.
    async fn vote(
        &self,
        voting: &VotingService,
        caller: &CallerIdentity,
        impact: i32,
    ) -> AppResult<VoteResult> {
        voting
            .submit_vote(Some(caller), Self::TYPE_TAG, self.id(), impact)
            .await
    }

    /// Vote +1.
    async fn upvote(&self, voting: &VotingService, caller: &CallerIdentity) -> AppResult<VoteResult> {
        self.vote(voting, caller, 1).await
    }

    /// Vote -1.
    async fn downvote(
        &self,
        voting: &VotingService,
        caller: &CallerIdentity,
    ) -> AppResult<VoteResult> {
        self.vote(voting, caller, -1).await
    }
}
