use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommentError {
    #[error("Comment text must not be empty")]
    EmptyText,

    #[error("Comment is too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("You must be logged in to do that")]
    AuthenticationRequired,
}
