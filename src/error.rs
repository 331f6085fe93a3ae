use thiserror::Error;

/// Error taxonomy of the booking engine. Every fallible operation returns one
/// of these; callers branch on the variant rather than on message text.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-range input. Never worth retrying.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity (room, session, seat, booking, voucher) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A business invariant would be violated: schedule overlap, seat already
    /// claimed, voucher expired or exhausted. Recoverable from the caller's
    /// point of view (pick another seat, another slot, drop the voucher).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage backend failed. Not a business outcome.
    #[error("storage error: {0}")]
    Database(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn other_sqlx_errors_map_to_database() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
