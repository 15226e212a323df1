//! # tutoria-store
//!
//! SQLite-backed history store for the Tutoria chat core: users and their
//! enrollment relationships, conversations keyed by their participant pair,
//! and the append-only message log.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection` with typed helpers for every domain model; callers
//! that live in async contexts are expected to lift calls onto the blocking
//! pool themselves.

pub mod conversations;
pub mod database;
pub mod enrollments;
pub mod messages;
pub mod migrations;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
