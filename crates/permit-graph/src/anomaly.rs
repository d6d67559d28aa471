//! Network anomaly checks over the resolved entities.
//!
//! Four independent statistical checks. Each is isolated: a failing check
//! is logged and skipped while the rest still run and persist. Findings
//! replace the `anomaly_findings` table wholesale.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use permit_config::AnomalyConfig;
use permit_core::enums::AnomalyKind;
use permit_core::ids::PREFIX_ANOMALY;
use permit_core::records::AnomalyFinding;
use permit_db::PermitDb;

use crate::error::GraphError;

/// Outcome of an anomaly scan, recorded in the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyReport {
    pub findings: usize,
    /// Names of checks that errored and were skipped.
    pub failed_checks: Vec<String>,
}

struct Draft {
    entity_id: String,
    kind: AnomalyKind,
    detail: String,
}

fn db_err(e: libsql::Error) -> GraphError {
    GraphError::Database(e.into())
}

/// Permit count per entity against the median for its kind.
async fn volume_check(db: &PermitDb, config: &AnomalyConfig) -> Result<Vec<Draft>, GraphError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT em.entity_id, e.entity_kind, COUNT(DISTINCT c.permit_ref) AS n
             FROM entity_members em
             JOIN contacts c ON c.id = em.contact_id
             JOIN entities e ON e.id = em.entity_id
             GROUP BY em.entity_id
             ORDER BY e.entity_kind, em.entity_id",
            (),
        )
        .await
        .map_err(db_err)?;

    let mut counts: Vec<(String, String, i64)> = Vec::new();
    while let Some(row) = rows.next().await.map_err(db_err)? {
        counts.push((
            row.get::<String>(0).map_err(db_err)?,
            row.get::<String>(1).map_err(db_err)?,
            row.get::<i64>(2).map_err(db_err)?,
        ));
    }

    let mut by_kind: HashMap<&str, Vec<i64>> = HashMap::new();
    for (_, kind, n) in &counts {
        by_kind.entry(kind.as_str()).or_default().push(*n);
    }
    let medians: HashMap<&str, f64> = by_kind
        .into_iter()
        .map(|(kind, mut values)| {
            values.sort_unstable();
            (kind, median(&values))
        })
        .collect();

    let mut drafts = Vec::new();
    for (entity_id, kind, n) in &counts {
        let median = medians.get(kind.as_str()).copied().unwrap_or(0.0);
        #[allow(clippy::cast_precision_loss)]
        let count = *n as f64;
        if median > 0.0 && count > config.volume_median_multiple * median {
            drafts.push(Draft {
                entity_id: entity_id.clone(),
                kind: AnomalyKind::Volume,
                detail: format!("{n} permits vs median {median} for kind {kind}"),
            });
        }
    }
    Ok(drafts)
}

#[allow(clippy::cast_precision_loss)]
fn median(sorted: &[i64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

/// One inspector handling an outsized share of an entity's inspected
/// permits.
async fn concentration_check(
    db: &PermitDb,
    config: &AnomalyConfig,
) -> Result<Vec<Draft>, GraphError> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    let mut rows = db
        .conn()
        .query(
            "SELECT em.entity_id, COUNT(DISTINCT i.permit_ref)
             FROM entity_members em
             JOIN contacts c ON c.id = em.contact_id
             JOIN inspections i ON i.permit_ref = c.permit_ref
             WHERE i.inspector IS NOT NULL
             GROUP BY em.entity_id",
            (),
        )
        .await
        .map_err(db_err)?;
    while let Some(row) = rows.next().await.map_err(db_err)? {
        totals.insert(
            row.get::<String>(0).map_err(db_err)?,
            row.get::<i64>(1).map_err(db_err)?,
        );
    }

    let mut rows = db
        .conn()
        .query(
            "SELECT em.entity_id, i.inspector, COUNT(DISTINCT i.permit_ref) AS k
             FROM entity_members em
             JOIN contacts c ON c.id = em.contact_id
             JOIN inspections i ON i.permit_ref = c.permit_ref
             WHERE i.inspector IS NOT NULL
             GROUP BY em.entity_id, i.inspector
             ORDER BY em.entity_id, i.inspector",
            (),
        )
        .await
        .map_err(db_err)?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await.map_err(db_err)? {
        let entity_id = row.get::<String>(0).map_err(db_err)?;
        let inspector = row.get::<String>(1).map_err(db_err)?;
        let handled = row.get::<i64>(2).map_err(db_err)?;

        let total = totals.get(&entity_id).copied().unwrap_or(0);
        if total < i64::from(config.min_permits) {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = handled as f64 / total as f64;
        if share >= config.concentration_share {
            drafts.push(Draft {
                entity_id,
                kind: AnomalyKind::Concentration,
                detail: format!(
                    "inspector {inspector} handled {handled} of {total} inspected permits"
                ),
            });
        }
    }
    Ok(drafts)
}

/// Most of an entity's permits landing in one neighborhood.
async fn geographic_check(
    db: &PermitDb,
    config: &AnomalyConfig,
) -> Result<Vec<Draft>, GraphError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT em.entity_id, p.neighborhood, COUNT(DISTINCT p.permit_ref) AS n
             FROM entity_members em
             JOIN contacts c ON c.id = em.contact_id
             JOIN permits p ON p.permit_ref = c.permit_ref
             WHERE p.neighborhood IS NOT NULL
             GROUP BY em.entity_id, p.neighborhood
             ORDER BY em.entity_id, p.neighborhood",
            (),
        )
        .await
        .map_err(db_err)?;

    let mut per_entity: HashMap<String, Vec<(String, i64)>> = HashMap::new();
    while let Some(row) = rows.next().await.map_err(db_err)? {
        per_entity
            .entry(row.get::<String>(0).map_err(db_err)?)
            .or_default()
            .push((
                row.get::<String>(1).map_err(db_err)?,
                row.get::<i64>(2).map_err(db_err)?,
            ));
    }

    let mut entity_ids: Vec<&String> = per_entity.keys().collect();
    entity_ids.sort();

    let mut drafts = Vec::new();
    for entity_id in entity_ids {
        let neighborhoods = &per_entity[entity_id];
        let total: i64 = neighborhoods.iter().map(|(_, n)| n).sum();
        if total < i64::from(config.min_permits) {
            continue;
        }
        for (neighborhood, n) in neighborhoods {
            #[allow(clippy::cast_precision_loss)]
            let share = *n as f64 / total as f64;
            if share >= config.geographic_share {
                drafts.push(Draft {
                    entity_id: entity_id.clone(),
                    kind: AnomalyKind::Geographic,
                    detail: format!("{n} of {total} permits in {neighborhood}"),
                });
            }
        }
    }
    Ok(drafts)
}

/// Expensive permits approved unusually fast.
async fn fast_approval_check(
    db: &PermitDb,
    config: &AnomalyConfig,
) -> Result<Vec<Draft>, GraphError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT DISTINCT em.entity_id, p.permit_ref, p.estimated_cost,
                    CAST(julianday(p.approved_date) - julianday(p.filed_date) AS INTEGER) AS days
             FROM entity_members em
             JOIN contacts c ON c.id = em.contact_id
             JOIN permits p ON p.permit_ref = c.permit_ref
             WHERE p.estimated_cost > ?1
               AND p.filed_date IS NOT NULL
               AND p.approved_date IS NOT NULL
               AND julianday(p.approved_date) - julianday(p.filed_date) < ?2
             ORDER BY em.entity_id, p.permit_ref",
            libsql::params![config.fast_approval_cost, config.fast_approval_days],
        )
        .await
        .map_err(db_err)?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await.map_err(db_err)? {
        let entity_id = row.get::<String>(0).map_err(db_err)?;
        let permit_ref = row.get::<String>(1).map_err(db_err)?;
        let cost = row.get::<f64>(2).map_err(db_err)?;
        let days = row.get::<i64>(3).map_err(db_err)?;
        drafts.push(Draft {
            entity_id,
            kind: AnomalyKind::FastApproval,
            detail: format!("permit {permit_ref} (${cost:.0}) approved in {days} days"),
        });
    }
    Ok(drafts)
}

/// Run all four checks and replace the findings table.
///
/// Check failures are captured per-check; only a storage failure while
/// persisting aborts the stage.
///
/// # Errors
///
/// Returns [`GraphError`] if the final write fails.
pub async fn detect(
    db: &PermitDb,
    config: &AnomalyConfig,
    as_of: DateTime<Utc>,
) -> Result<AnomalyReport, GraphError> {
    let checks: [(&str, Result<Vec<Draft>, GraphError>); 4] = [
        ("volume", volume_check(db, config).await),
        ("concentration", concentration_check(db, config).await),
        ("geographic", geographic_check(db, config).await),
        ("fast_approval", fast_approval_check(db, config).await),
    ];

    let mut drafts = Vec::new();
    let mut failed_checks = Vec::new();
    for (name, result) in checks {
        match result {
            Ok(found) => drafts.extend(found),
            Err(error) => {
                tracing::warn!(check = name, %error, "anomaly check failed, skipping");
                failed_checks.push(name.to_string());
            }
        }
    }

    let mut findings = Vec::with_capacity(drafts.len());
    for draft in drafts {
        findings.push(AnomalyFinding {
            id: db.generate_id(PREFIX_ANOMALY).await?,
            entity_id: draft.entity_id,
            kind: draft.kind,
            detail: draft.detail,
            detected_at: as_of,
        });
    }
    db.replace_anomaly_findings(&findings).await?;

    let report = AnomalyReport {
        findings: findings.len(),
        failed_checks,
    };
    tracing::info!(
        findings = report.findings,
        failed = report.failed_checks.len(),
        "anomaly scan complete"
    );
    Ok(report)
}
