//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod upload;
pub mod user;
pub mod vote;

pub use comment::Entity as Comment;
pub use upload::Entity as Upload;
pub use user::Entity as User;
pub use vote::Entity as Vote;
