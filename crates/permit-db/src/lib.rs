//! # permit-db
//!
//! libSQL storage layer for the permitgraph engine.
//!
//! Holds the raw civic record tables (contacts, permits, inspections,
//! violations, complaints) written by the external ingestion jobs, and the
//! derived tables (entities, relationships, signals, property health,
//! anomaly findings) rebuilt by each engine run.
//!
//! Uses the `libsql` crate: a local embedded database during development,
//! or an embedded replica synced against a networked Turso database in
//! production. Derived-table writes always replace the previous run's rows
//! inside a single transaction, so concurrent readers only ever observe a
//! complete run.

pub mod error;
pub mod helpers;
mod migrations;
pub mod queries;
pub mod repos;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle for all permitgraph storage operations.
///
/// Wraps a libSQL database and connection. Repo methods for each table
/// group are implemented in [`repos`]; the read-only consumer surface lives
/// in [`queries`].
pub struct PermitDb {
    db: libsql::Database,
    conn: libsql::Connection,
    synced: bool,
}

impl PermitDb {
    /// Open a local-only database at the given path (no cloud sync).
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let permit_db = Self {
            db,
            conn,
            synced: false,
        };
        permit_db.run_migrations().await?;
        Ok(permit_db)
    }

    /// Open an embedded replica synced against a remote Turso database.
    ///
    /// Performs an initial sync before running migrations so the local
    /// replica starts from current remote state.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the replica cannot be opened, synced, or
    /// migrated.
    pub async fn open_synced(
        local_replica_path: &str,
        remote_url: &str,
        auth_token: &str,
    ) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote_replica(
            local_replica_path,
            remote_url.to_string(),
            auth_token.to_string(),
        )
        .build()
        .await?;
        db.sync().await?;
        let conn = db.connect()?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let permit_db = Self {
            db,
            conn,
            synced: true,
        };
        permit_db.run_migrations().await?;
        Ok(permit_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    ///
    /// The pipeline crates use this for their set-based aggregation SQL.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Whether this handle is backed by a synced remote replica.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    /// Push local frames to the remote replica (no-op for local databases).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the sync fails.
    pub async fn sync(&self) -> Result<(), DatabaseError> {
        if self.synced {
            self.db.sync().await?;
        }
        Ok(())
    }

    /// Generate a prefixed row ID via libSQL. Returns e.g. `"sig-a3f8b2c1"`.
    ///
    /// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the
    /// prefix. Entity IDs are NOT generated here; the resolver assigns those
    /// sequentially for determinism.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}
