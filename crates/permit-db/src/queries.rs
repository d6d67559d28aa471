//! Read-only consumer surface.
//!
//! Entry points for analysts and downstream tools. Nothing here mutates;
//! the per-table repo methods in [`crate::repos`] cover single-row lookups
//! (`get_entity`, `get_property_health`, `signals_for_property`,
//! `list_anomaly_findings`, `run_history`), while this module holds the
//! cross-cutting reads. Graph traversals (ego networks, components) live in
//! the graph crate since they need the in-memory structure.

use permit_core::records::Entity;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::repos::entities::{ENTITY_COLUMNS, row_to_entity};

impl PermitDb {
    /// Find entities whose canonical name or firm contains the fragment,
    /// case-insensitively.
    ///
    /// Results are ordered by contact count (busiest first), then id for a
    /// stable tie-break.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn search_entities(
        &self,
        name_fragment: &str,
        limit: u32,
    ) -> Result<Vec<Entity>, DatabaseError> {
        // Escape LIKE metacharacters so a fragment like "100%" matches
        // literally.
        let escaped = name_fragment
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities
                     WHERE canonical_name LIKE ?1 ESCAPE '\\'
                        OR canonical_firm LIKE ?1 ESCAPE '\\'
                     ORDER BY contact_count DESC, id LIMIT ?2"
                ),
                libsql::params![pattern, i64::from(limit)],
            )
            .await?;

        let mut entities = Vec::new();
        while let Some(row) = rows.next().await? {
            entities.push(row_to_entity(&row)?);
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use permit_core::enums::{Confidence, EntityKind};

    fn entity(id: &str, name: &str, firm: Option<&str>, contacts: u32) -> Entity {
        Entity {
            id: id.into(),
            canonical_name: name.into(),
            canonical_firm: firm.map(String::from),
            entity_kind: EntityKind::Contractor,
            roles: vec![EntityKind::Contractor],
            confidence: Confidence::High,
            contact_count: contacts,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn search_matches_name_and_firm() {
        let db = PermitDb::open_local(":memory:").await.unwrap();
        db.replace_entities(
            &[
                entity("ent-000001", "ACME BUILDERS", None, 2),
                entity("ent-000002", "JANE DOE", Some("ACME DESIGN GROUP"), 5),
                entity("ent-000003", "OTHER CORP", None, 1),
            ],
            &[],
        )
        .await
        .unwrap();

        let hits = db.search_entities("acme", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // Busiest first
        assert_eq!(hits[0].id, "ent-000002");
        assert_eq!(hits[1].id, "ent-000001");
    }

    #[tokio::test]
    async fn search_respects_limit_and_escapes_wildcards() {
        let db = PermitDb::open_local(":memory:").await.unwrap();
        db.replace_entities(
            &[
                entity("ent-000001", "100% ROOFING", None, 1),
                entity("ent-000002", "100 MAIN LLC", None, 1),
                entity("ent-000003", "100X BUILDERS", None, 1),
            ],
            &[],
        )
        .await
        .unwrap();

        // "%" is literal, so only the roofing entity matches
        let hits = db.search_entities("100%", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].canonical_name, "100% ROOFING");

        let limited = db.search_entities("100", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
