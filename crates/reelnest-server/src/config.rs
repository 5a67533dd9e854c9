//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use reelnest_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_MAX_COMMENT_CHARS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None`, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Admin API bearer token. Required to access /admin/* endpoints.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Public base URL of the media bucket, used to turn avatar object
    /// paths into URLs.
    /// Env: `AVATAR_BASE_URL`
    /// Default: none (paths are used as-is).
    pub avatar_base_url: Option<String>,

    /// Longest accepted comment, in characters.
    /// Env: `MAX_COMMENT_LENGTH`
    /// Default: `2000`
    pub max_comment_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            admin_token: None,
            avatar_base_url: None,
            max_comment_chars: DEFAULT_MAX_COMMENT_CHARS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(token) = var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(url) = var("AVATAR_BASE_URL").filter(|u| !u.is_empty()) {
            config.avatar_base_url = Some(url);
        }

        if let Some(val) = var("MAX_COMMENT_LENGTH") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_comment_chars = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_COMMENT_LENGTH, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
