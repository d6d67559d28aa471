//! Entity repository — atomic replacement of the resolved partition, plus
//! reads.
//!
//! The resolver builds the full Contact → Entity partition in memory and
//! hands it here; `replace_entities` swaps the previous run's rows inside a
//! single transaction so readers never observe a partial partition.

use permit_core::records::Entity;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};

pub(crate) fn row_to_entity(row: &libsql::Row) -> Result<Entity, DatabaseError> {
    let roles_json = row.get::<String>(4)?;
    Ok(Entity {
        id: row.get::<String>(0)?,
        canonical_name: row.get::<String>(1)?,
        canonical_firm: get_opt_string(row, 2)?,
        entity_kind: parse_enum(&row.get::<String>(3)?)?,
        roles: serde_json::from_str(&roles_json)
            .map_err(|e| DatabaseError::Query(format!("Invalid roles JSON: {e}")))?,
        confidence: parse_enum(&row.get::<String>(5)?)?,
        contact_count: u32::try_from(row.get::<i64>(6)?)
            .map_err(|e| DatabaseError::Query(format!("Negative contact_count: {e}")))?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

pub(crate) const ENTITY_COLUMNS: &str =
    "id, canonical_name, canonical_firm, entity_kind, roles, confidence, contact_count, created_at";

impl PermitDb {
    /// Replace the entity tables with a freshly resolved partition.
    ///
    /// Deletes `relationships`, `entity_members`, and `entities` (the edge
    /// set references the old entity ids and is rebuilt by the next graph
    /// pass), then inserts the new rows. All inside one transaction: either
    /// the new partition lands whole or the old one stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on any write failure; the transaction rolls
    /// back on drop.
    pub async fn replace_entities(
        &self,
        entities: &[Entity],
        members: &[(String, i64)],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn().transaction().await?;

        tx.execute("DELETE FROM relationships", ()).await?;
        tx.execute("DELETE FROM entity_members", ()).await?;
        tx.execute("DELETE FROM entities", ()).await?;

        for entity in entities {
            let roles_json = serde_json::to_string(&entity.roles)
                .map_err(|e| DatabaseError::Other(e.into()))?;
            tx.execute(
                "INSERT INTO entities (id, canonical_name, canonical_firm, entity_kind, roles, confidence, contact_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                libsql::params![
                    entity.id.as_str(),
                    entity.canonical_name.as_str(),
                    entity.canonical_firm.as_deref(),
                    entity.entity_kind.as_str(),
                    roles_json,
                    entity.confidence.as_str(),
                    i64::from(entity.contact_count),
                    entity.created_at.to_rfc3339()
                ],
            )
            .await?;
        }

        for (entity_id, contact_id) in members {
            tx.execute(
                "INSERT INTO entity_members (entity_id, contact_id) VALUES (?1, ?2)",
                libsql::params![entity_id.as_str(), *contact_id],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one entity by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no such entity exists.
    pub async fn get_entity(&self, id: &str) -> Result<Entity, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_entity(&row)
    }

    /// Fetch all entities ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn list_entities(&self) -> Result<Vec<Entity>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ENTITY_COLUMNS} FROM entities ORDER BY id"),
                (),
            )
            .await?;

        let mut entities = Vec::new();
        while let Some(row) = rows.next().await? {
            entities.push(row_to_entity(&row)?);
        }
        Ok(entities)
    }

    /// Fetch the contact ids belonging to one entity, ordered.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn entity_contact_ids(&self, entity_id: &str) -> Result<Vec<i64>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT contact_id FROM entity_members WHERE entity_id = ?1 ORDER BY contact_id",
                [entity_id],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }
}
