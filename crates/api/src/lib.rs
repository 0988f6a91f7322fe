//! HTTP API layer for sharehub.
//!
//! A thin axum adapter over the core services:
//!
//! - **Endpoints**: voting, uploads, comments, accounts
//! - **Extractors**: authenticated caller resolution
//! - **Middleware**: bearer-token authentication
//!
//! Identity is resolved here; the core only ever sees a
//! [`sharehub_core::CallerIdentity`].

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
