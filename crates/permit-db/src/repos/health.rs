//! Property health repository.

use permit_core::records::PropertyHealth;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{parse_datetime, parse_enum};

fn row_to_health(row: &libsql::Row) -> Result<PropertyHealth, DatabaseError> {
    Ok(PropertyHealth {
        property_key: row.get::<String>(0)?,
        tier: parse_enum(&row.get::<String>(1)?)?,
        reason: row.get::<String>(2)?,
        computed_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl PermitDb {
    /// Replace the property health table with a fresh aggregation pass,
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on any write failure; rolls back on drop.
    pub async fn replace_property_health(
        &self,
        rows: &[PropertyHealth],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn().transaction().await?;
        tx.execute("DELETE FROM property_health", ()).await?;

        for health in rows {
            tx.execute(
                "INSERT INTO property_health (property_key, tier, reason, computed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    health.property_key.as_str(),
                    health.tier.as_str(),
                    health.reason.as_str(),
                    health.computed_at.to_rfc3339()
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch the health row for one property, if any.
    ///
    /// Absence means no signals fired for the property; consumers treat that
    /// as on-track.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn get_property_health(
        &self,
        property_key: &str,
    ) -> Result<Option<PropertyHealth>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT property_key, tier, reason, computed_at FROM property_health
                 WHERE property_key = ?1",
                [property_key],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_health(&row)?)),
            None => Ok(None),
        }
    }

    /// Fetch every property health row, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn list_property_health(&self) -> Result<Vec<PropertyHealth>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT property_key, tier, reason, computed_at FROM property_health
                 ORDER BY property_key",
                (),
            )
            .await?;

        let mut all = Vec::new();
        while let Some(row) = rows.next().await? {
            all.push(row_to_health(&row)?);
        }
        Ok(all)
    }
}
