//! Error types for gradebook store operations.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Which store constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Check,
    ForeignKey,
    Trigger,
    NotNull,
    Other,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Check => "check",
            Self::ForeignKey => "foreign_key",
            Self::Trigger => "trigger",
            Self::NotNull => "not_null",
            Self::Other => "other",
        }
    }

    fn from_extended_code(code: i32) -> Self {
        match code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Self::Unique
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => Self::Check,
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey,
            rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER => Self::Trigger,
            rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNull,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("constraint violation ({}): {message}", .kind.as_str())]
    ConstraintViolation {
        kind: ConstraintKind,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(inner, msg)
                if inner.code == ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation {
                    kind: ConstraintKind::from_extended_code(inner.extended_code),
                    message: msg.clone().unwrap_or_else(|| inner.to_string()),
                }
            }
            _ => Error::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
