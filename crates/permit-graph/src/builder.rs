//! Edge construction from the resolved entity partition.
//!
//! One set-based pass: distinct (entity, permit) pairs self-joined on
//! `permit_ref` with `a < b`, joined to permits for the edge attributes,
//! folded per pair in id order. The fold order and the sorted attribute
//! sets make recomputation bit-identical for identical input.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use permit_config::GraphConfig;
use permit_core::records::Relationship;
use permit_db::PermitDb;
use permit_db::helpers::parse_optional_date;

use crate::error::GraphError;

/// Counts reported by an edge build, recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphReport {
    pub edges: usize,
}

fn db_err(e: libsql::Error) -> GraphError {
    GraphError::Database(e.into())
}

// A malformed date on one permit row loses that date, not the stage.
fn lenient_date(raw: Option<String>, permit_ref: &str, column: &str) -> Option<NaiveDate> {
    let value = raw?;
    match parse_optional_date(Some(&value)) {
        Ok(date) => date,
        Err(_) => {
            tracing::warn!(permit = permit_ref, column, %value, "unparseable date, ignoring");
            None
        }
    }
}

const SHARED_PERMIT_SQL: &str = "
    WITH entity_permits AS (
        SELECT DISTINCT em.entity_id, c.permit_ref
        FROM entity_members em
        JOIN contacts c ON c.id = em.contact_id
    )
    SELECT a.entity_id, b.entity_id, a.permit_ref,
           p.permit_type, p.filed_date, p.status_date, p.estimated_cost, p.neighborhood
    FROM entity_permits a
    JOIN entity_permits b
      ON b.permit_ref = a.permit_ref AND a.entity_id < b.entity_id
    LEFT JOIN permits p ON p.permit_ref = a.permit_ref
    ORDER BY a.entity_id, b.entity_id, a.permit_ref";

struct EdgeAccumulator {
    entity_a: String,
    entity_b: String,
    shared_permits: u32,
    permit_refs: Vec<String>,
    permit_types: BTreeSet<String>,
    first_seen: Option<NaiveDate>,
    last_seen: Option<NaiveDate>,
    total_cost: f64,
    neighborhoods: BTreeSet<String>,
}

impl EdgeAccumulator {
    fn new(entity_a: String, entity_b: String) -> Self {
        Self {
            entity_a,
            entity_b,
            shared_permits: 0,
            permit_refs: Vec::new(),
            permit_types: BTreeSet::new(),
            first_seen: None,
            last_seen: None,
            total_cost: 0.0,
            neighborhoods: BTreeSet::new(),
        }
    }

    fn is_pair(&self, entity_a: &str, entity_b: &str) -> bool {
        self.entity_a == entity_a && self.entity_b == entity_b
    }

    fn finish(self) -> Relationship {
        Relationship {
            entity_a: self.entity_a,
            entity_b: self.entity_b,
            shared_permits: self.shared_permits,
            permit_refs: self.permit_refs,
            permit_types: self.permit_types.into_iter().collect(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            total_cost: self.total_cost,
            neighborhoods: self.neighborhoods.into_iter().collect(),
        }
    }
}

/// Rebuild the relationships table from the current entity partition.
///
/// # Errors
///
/// Returns [`GraphError`] if the aggregation query or the transactional
/// replace fails. The previous edge set survives a failed run untouched.
pub async fn build_edges(db: &PermitDb, config: &GraphConfig) -> Result<GraphReport, GraphError> {
    let mut rows = db
        .conn()
        .query(SHARED_PERMIT_SQL, ())
        .await
        .map_err(db_err)?;

    let mut edges: Vec<Relationship> = Vec::new();
    let mut current: Option<EdgeAccumulator> = None;

    while let Some(row) = rows.next().await.map_err(db_err)? {
        let entity_a = row.get::<String>(0).map_err(db_err)?;
        let entity_b = row.get::<String>(1).map_err(db_err)?;
        let permit_ref = row.get::<String>(2).map_err(db_err)?;
        let permit_type = row.get::<Option<String>>(3).map_err(db_err)?;
        let filed = lenient_date(row.get::<Option<String>>(4).map_err(db_err)?, &permit_ref, "filed_date");
        let status_date =
            lenient_date(row.get::<Option<String>>(5).map_err(db_err)?, &permit_ref, "status_date");
        let cost = row.get::<Option<f64>>(6).map_err(db_err)?;
        let neighborhood = row.get::<Option<String>>(7).map_err(db_err)?;

        if !current
            .as_ref()
            .is_some_and(|acc| acc.is_pair(&entity_a, &entity_b))
        {
            if let Some(acc) = current.take() {
                edges.push(acc.finish());
            }
            current = Some(EdgeAccumulator::new(entity_a, entity_b));
        }
        if let Some(acc) = current.as_mut() {
            acc.shared_permits += 1;
            if acc.permit_refs.len() < config.permit_ref_cap {
                acc.permit_refs.push(permit_ref);
            }
            if let Some(ty) = permit_type {
                acc.permit_types.insert(ty);
            }
            if let Some(date) = filed {
                acc.first_seen = Some(acc.first_seen.map_or(date, |d| d.min(date)));
            }
            if let Some(date) = status_date.or(filed) {
                acc.last_seen = Some(acc.last_seen.map_or(date, |d| d.max(date)));
            }
            acc.total_cost += cost.unwrap_or(0.0);
            if let Some(hood) = neighborhood {
                acc.neighborhoods.insert(hood);
            }
        }
    }
    if let Some(acc) = current.take() {
        edges.push(acc.finish());
    }

    db.replace_relationships(&edges).await?;

    let report = GraphReport { edges: edges.len() };
    tracing::info!(edges = report.edges, "relationship edges rebuilt");
    Ok(report)
}
