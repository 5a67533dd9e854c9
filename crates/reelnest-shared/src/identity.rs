use serde::{Deserialize, Serialize};

use crate::constants::AVATAR_PLACEHOLDER;
use crate::types::UserId;

/// The authenticated user a mutation is performed on behalf of.
///
/// Built by the server from a session; tree and store operations take it
/// as an explicit argument instead of reading any ambient request state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    /// Public URL of the avatar, already resolved (see [`resolve_avatar_url`]).
    pub avatar_url: String,
}

/// Map a stored avatar object path to the URL shown next to comments.
///
/// With a `public_base` the path is joined onto it (storage bucket style);
/// users without an avatar get the placeholder image.
pub fn resolve_avatar_url(avatar_path: Option<&str>, public_base: Option<&str>) -> String {
    let Some(path) = avatar_path.map(str::trim).filter(|p| !p.is_empty()) else {
        return AVATAR_PLACEHOLDER.to_string();
    };

    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    match public_base {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => path.to_string(),
    }
}
