//! API endpoints.

mod comments;
mod uploads;
mod users;
mod votes;

use axum::Router;

use crate::middleware::AppState;

pub use votes::{VoteResponse, VoteResultResponse};

/// Default page size of list endpoints.
const fn default_limit() -> u64 {
    10
}

/// Largest accepted page size.
const MAX_LIMIT: u64 = 100;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/votes", votes::router())
        .nest("/uploads", uploads::router())
        .nest("/comments", comments::router())
        .merge(users::router())
}
