//! Core business logic for sharehub.
//!
//! The heart of this crate is the voting engine: a ledger of individual
//! votes, a capability any entity type can implement to become votable,
//! and the reconciliation service that keeps each entity's denormalized
//! `{sum, count}` aggregate in step with the ledger.

pub mod services;

pub use services::*;
