use thiserror::Error;

/// Errors surfaced by the signal stage.
///
/// Individual detector failures are captured inside the bank and never
/// reach here; anything that does is a run-level storage problem.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Database error: {0}")]
    Database(#[from] permit_db::error::DatabaseError),
}

impl From<libsql::Error> for SignalError {
    fn from(e: libsql::Error) -> Self {
        Self::Database(e.into())
    }
}
