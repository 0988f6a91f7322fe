//! Business logic services.

pub mod comment;
pub mod identity;
pub mod ledger;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod registry;
pub mod upload;
pub mod user;
pub mod votable;
pub mod voting;

pub use comment::{CommentService, CreateCommentInput};
pub use identity::{CallerIdentity, Role};
pub use ledger::{DbVoteLedger, SharedVoteLedger, VoteLedger};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryVotableStore, InMemoryVoteLedger};
pub use registry::{VotableRegistration, VotableRegistry, VotableRegistryBuilder};
pub use upload::{CreateUploadInput, UpdateUploadInput, UploadService};
pub use user::{CreateUserInput, UserService};
pub use votable::{ImpactPolicy, Votable, VotableStore, VotingAggregate, VotingDelta};
pub use voting::{VoteResult, VotingService};
