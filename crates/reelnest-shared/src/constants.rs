/// Avatar shown for users who never uploaded one.
pub const AVATAR_PLACEHOLDER: &str = "/avatar-placeholder.png";

/// Default upper bound on comment length, in characters.
pub const DEFAULT_MAX_COMMENT_CHARS: usize = 2_000;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
