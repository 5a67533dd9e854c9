//! Users and the bearer sessions issued to them.

use chrono::Utc;
use rusqlite::params;

use reelnest_shared::UserId;

use crate::database::{is_unique_violation, parse_timestamp, Database};
use crate::error::{not_found, Result, StoreError};
use crate::models::{SessionToken, User};

impl Database {
    pub fn create_user(&self, username: &str, avatar_path: Option<&str>) -> Result<User> {
        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            avatar_path: avatar_path.map(str::to_string),
            created_at: Utc::now(),
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, username, avatar_path, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.as_str(),
                    user.username,
                    user.avatar_path,
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("username {username}"))
                } else {
                    StoreError::Sqlite(e)
                }
            })?;

        tracing::debug!(user = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, avatar_path, created_at FROM users WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Issue a new session token for an existing user.
    pub fn create_session(&self, user_id: &UserId) -> Result<SessionToken> {
        // fail with NotFound rather than a foreign key error
        self.get_user(user_id)?;

        let token = SessionToken::new();
        self.conn().execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token.0.to_string(), user_id.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(token)
    }

    /// The user behind a session token, or `NotFound` for unknown tokens.
    pub fn resolve_session(&self, token: SessionToken) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT u.id, u.username, u.avatar_path, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token.0.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    pub fn delete_session(&self, token: SessionToken) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM sessions WHERE token = ?1",
            params![token.0.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let username: String = row.get(1)?;
    let avatar_path: Option<String> = row.get(2)?;
    let created_str: String = row.get(3)?;

    Ok(User {
        id: UserId(id),
        username,
        avatar_path,
        created_at: parse_timestamp(3, &created_str)?,
    })
}
