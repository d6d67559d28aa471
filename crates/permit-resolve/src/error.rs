use thiserror::Error;

/// Errors surfaced by the resolver stage.
///
/// The cascade itself never fails on a contact; anything that reaches here
/// is a storage problem, which aborts the stage with the previous derived
/// tables intact.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Database error: {0}")]
    Database(#[from] permit_db::error::DatabaseError),
}
