//! # reelnest-shared
//!
//! Types and pure logic shared by the store and the HTTP server:
//! identifiers, the comment tree and its mutations, and the acting-user
//! identity every mutation is performed on behalf of.

pub mod comments;
pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use comments::{CommentNode, TreeEdit};
pub use error::CommentError;
pub use identity::Actor;
pub use types::{CommentId, MediaId, UserId};
