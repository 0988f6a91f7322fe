//! Repositories for database access.

mod comment;
mod upload;
mod user;
mod vote;

pub use comment::CommentRepository;
pub use upload::UploadRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;
