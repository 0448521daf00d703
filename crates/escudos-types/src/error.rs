use thiserror::Error;

/// Errors produced when constructing or parsing foundation types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("event id must not be empty")]
    EmptyEventId,

    #[error("unknown grant source: {0}")]
    UnknownSource(String),

    #[error("invalid grant id: {0}")]
    InvalidGrantId(String),
}
