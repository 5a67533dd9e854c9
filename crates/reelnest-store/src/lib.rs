//! # reelnest-store
//!
//! SQLite storage for the comment service. Each media row carries its whole
//! comment forest as one JSON document; the crate exposes a synchronous
//! `Database` handle wrapping a `rusqlite::Connection` with typed helpers
//! for users, sessions, media, comments and reports.

pub mod comments;
pub mod database;
pub mod media;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
