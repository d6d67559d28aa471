//! Relationship repository — co-occurrence edge rows.
//!
//! Edge rows are produced by the graph builder's set-based aggregation and
//! replaced wholesale each run. Reads serve both the 1-hop consumer query
//! and the in-memory graph construction for ego networks and components.

use permit_core::records::Relationship;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_optional_date, parse_string_list, to_json_list};

pub(crate) fn row_to_relationship(row: &libsql::Row) -> Result<Relationship, DatabaseError> {
    Ok(Relationship {
        entity_a: row.get::<String>(0)?,
        entity_b: row.get::<String>(1)?,
        shared_permits: u32::try_from(row.get::<i64>(2)?)
            .map_err(|e| DatabaseError::Query(format!("Negative shared_permits: {e}")))?,
        permit_refs: parse_string_list(&row.get::<String>(3)?)?,
        permit_types: parse_string_list(&row.get::<String>(4)?)?,
        first_seen: parse_optional_date(get_opt_string(row, 5)?.as_deref())?,
        last_seen: parse_optional_date(get_opt_string(row, 6)?.as_deref())?,
        total_cost: row.get::<f64>(7)?,
        neighborhoods: parse_string_list(&row.get::<String>(8)?)?,
    })
}

const EDGE_COLUMNS: &str = "entity_a, entity_b, shared_permits, permit_refs, permit_types, first_seen, last_seen, total_cost, neighborhoods";

impl PermitDb {
    /// Replace the edge set with a freshly aggregated one, atomically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on any write failure (including an edge that
    /// violates the `entity_a < entity_b` constraint); rolls back on drop.
    pub async fn replace_relationships(
        &self,
        edges: &[Relationship],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn().transaction().await?;
        tx.execute("DELETE FROM relationships", ()).await?;

        for edge in edges {
            tx.execute(
                "INSERT INTO relationships (entity_a, entity_b, shared_permits, permit_refs, permit_types, first_seen, last_seen, total_cost, neighborhoods)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                libsql::params![
                    edge.entity_a.as_str(),
                    edge.entity_b.as_str(),
                    i64::from(edge.shared_permits),
                    to_json_list(&edge.permit_refs),
                    to_json_list(&edge.permit_types),
                    edge.first_seen.map(|d| d.to_string()),
                    edge.last_seen.map(|d| d.to_string()),
                    edge.total_cost,
                    to_json_list(&edge.neighborhoods)
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch every edge, ordered by pair.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn list_relationships(&self) -> Result<Vec<Relationship>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EDGE_COLUMNS} FROM relationships ORDER BY entity_a, entity_b"),
                (),
            )
            .await?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next().await? {
            edges.push(row_to_relationship(&row)?);
        }
        Ok(edges)
    }

    /// Fetch the edges touching one entity (1-hop neighborhood), strongest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn relationships_for_entity(
        &self,
        entity_id: &str,
    ) -> Result<Vec<Relationship>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EDGE_COLUMNS} FROM relationships
                     WHERE entity_a = ?1 OR entity_b = ?1
                     ORDER BY shared_permits DESC, entity_a, entity_b"
                ),
                [entity_id],
            )
            .await?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next().await? {
            edges.push(row_to_relationship(&row)?);
        }
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use permit_core::enums::{Confidence, EntityKind};
    use permit_core::records::Entity;

    async fn db_with_entities(ids: &[&str]) -> PermitDb {
        let db = PermitDb::open_local(":memory:").await.unwrap();
        let entities: Vec<Entity> = ids
            .iter()
            .map(|id| Entity {
                id: (*id).to_string(),
                canonical_name: (*id).to_uppercase(),
                canonical_firm: None,
                entity_kind: EntityKind::Contractor,
                roles: vec![EntityKind::Contractor],
                confidence: Confidence::High,
                contact_count: 1,
                created_at: Utc::now(),
            })
            .collect();
        db.replace_entities(&entities, &[]).await.unwrap();
        db
    }

    fn edge(a: &str, b: &str, shared: u32) -> Relationship {
        Relationship {
            entity_a: a.into(),
            entity_b: b.into(),
            shared_permits: shared,
            permit_refs: vec!["P1".into()],
            permit_types: vec!["alterations".into()],
            first_seen: NaiveDate::from_ymd_opt(2022, 1, 1),
            last_seen: NaiveDate::from_ymd_opt(2023, 6, 1),
            total_cost: 125_000.0,
            neighborhoods: vec!["Mission".into()],
        }
    }

    #[tokio::test]
    async fn replace_and_list_roundtrip() {
        let db = db_with_entities(&["ent-000001", "ent-000002", "ent-000003"]).await;
        let edges = vec![
            edge("ent-000001", "ent-000002", 3),
            edge("ent-000002", "ent-000003", 1),
        ];
        db.replace_relationships(&edges).await.unwrap();

        let listed = db.list_relationships().await.unwrap();
        assert_eq!(listed, edges);
    }

    #[tokio::test]
    async fn neighbors_ordered_by_strength() {
        let db = db_with_entities(&["ent-000001", "ent-000002", "ent-000003"]).await;
        db.replace_relationships(&[
            edge("ent-000001", "ent-000002", 1),
            edge("ent-000002", "ent-000003", 5),
        ])
        .await
        .unwrap();

        let edges = db.relationships_for_entity("ent-000002").await.unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].shared_permits, 5);
        assert_eq!(edges[1].shared_permits, 1);
    }

    #[tokio::test]
    async fn replace_truncates_previous_edges() {
        let db = db_with_entities(&["ent-000001", "ent-000002", "ent-000003"]).await;
        db.replace_relationships(&[edge("ent-000001", "ent-000002", 1)])
            .await
            .unwrap();
        db.replace_relationships(&[edge("ent-000001", "ent-000003", 2)])
            .await
            .unwrap();

        let listed = db.list_relationships().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entity_b, "ent-000003");
    }
}
