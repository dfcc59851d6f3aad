use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row holds a value this version cannot interpret.
    #[error("corrupt session record for {user_id}: {reason}")]
    CorruptRecord { user_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
