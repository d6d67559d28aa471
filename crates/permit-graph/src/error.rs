use thiserror::Error;

/// Errors surfaced by the graph stage.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Database error: {0}")]
    Database(#[from] permit_db::error::DatabaseError),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}
