//! Bearer-token checks for sessions and the admin API.

use axum::http::HeaderMap;
use uuid::Uuid;

use reelnest_shared::identity::resolve_avatar_url;
use reelnest_shared::{Actor, CommentError};
use reelnest_store::{SessionToken, StoreError, User};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::state::AppState;

/// A request made with a valid session token.
pub struct Session {
    pub token: SessionToken,
    pub user: User,
    pub actor: Actor,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = auth.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the session behind the `Authorization` header.
///
/// Missing, malformed and unknown tokens all map to
/// [`CommentError::AuthenticationRequired`].
pub async fn require_session(headers: &HeaderMap, state: &AppState) -> Result<Session, ServerError> {
    let raw = bearer_token(headers).ok_or(CommentError::AuthenticationRequired)?;
    let token = Uuid::parse_str(raw)
        .map(SessionToken)
        .map_err(|_| CommentError::AuthenticationRequired)?;

    let user = match state.with_db(move |db| db.resolve_session(token)).await {
        Ok(user) => user,
        Err(ServerError::Store(StoreError::NotFound)) => {
            tracing::debug!("Unknown session token");
            return Err(CommentError::AuthenticationRequired.into());
        }
        Err(e) => return Err(e),
    };

    let actor = Actor {
        user_id: user.id.clone(),
        username: user.username.clone(),
        avatar_url: resolve_avatar_url(
            user.avatar_path.as_deref(),
            state.config.avatar_base_url.as_deref(),
        ),
    };

    Ok(Session { token, user, actor })
}

/// Like [`require_session`], but an absent header is not an error.
/// A header that is present and invalid is still rejected.
pub async fn optional_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<Session>, ServerError> {
    if !headers.contains_key("authorization") {
        return Ok(None);
    }
    require_session(headers, state).await.map(Some)
}

pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let token = bearer_token(headers).unwrap_or("");

    // Constant-time comparison to prevent timing attacks on admin token.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("authorization", HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_admin_token() {
        let mut config = ServerConfig::default();
        assert!(matches!(
            verify_admin_token(&headers("Bearer secret"), &config),
            Err(ServerError::Forbidden(_))
        ));

        config.admin_token = Some("secret".to_string());
        assert!(verify_admin_token(&headers("Bearer secret"), &config).is_ok());
        assert!(verify_admin_token(&headers("Bearer secreT"), &config).is_err());
        assert!(verify_admin_token(&HeaderMap::new(), &config).is_err());
    }
}
