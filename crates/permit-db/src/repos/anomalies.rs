//! Anomaly findings repository.
//!
//! A lighter-weight result set than signals: flagged entities consumed ad
//! hoc by analysts, not feeding the health tiers.

use permit_core::records::AnomalyFinding;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{parse_datetime, parse_enum};

fn row_to_finding(row: &libsql::Row) -> Result<AnomalyFinding, DatabaseError> {
    Ok(AnomalyFinding {
        id: row.get::<String>(0)?,
        entity_id: row.get::<String>(1)?,
        kind: parse_enum(&row.get::<String>(2)?)?,
        detail: row.get::<String>(3)?,
        detected_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

impl PermitDb {
    /// Replace the anomaly findings with a fresh scan, atomically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on any write failure; rolls back on drop.
    pub async fn replace_anomaly_findings(
        &self,
        findings: &[AnomalyFinding],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn().transaction().await?;
        tx.execute("DELETE FROM anomaly_findings", ()).await?;

        for finding in findings {
            tx.execute(
                "INSERT INTO anomaly_findings (id, entity_id, kind, detail, detected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![
                    finding.id.as_str(),
                    finding.entity_id.as_str(),
                    finding.kind.as_str(),
                    finding.detail.as_str(),
                    finding.detected_at.to_rfc3339()
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch anomaly findings, ordered by entity then kind.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn list_anomaly_findings(
        &self,
        limit: u32,
    ) -> Result<Vec<AnomalyFinding>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, entity_id, kind, detail, detected_at FROM anomaly_findings
                 ORDER BY entity_id, kind LIMIT ?1",
                [i64::from(limit)],
            )
            .await?;

        let mut findings = Vec::new();
        while let Some(row) = rows.next().await? {
            findings.push(row_to_finding(&row)?);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use permit_core::enums::AnomalyKind;

    async fn test_db() -> PermitDb {
        PermitDb::open_local(":memory:").await.unwrap()
    }

    fn finding(id: &str, entity_id: &str, kind: AnomalyKind) -> AnomalyFinding {
        AnomalyFinding {
            id: id.into(),
            entity_id: entity_id.into(),
            kind,
            detail: "42 permits vs median 6".into(),
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replace_and_list() {
        let db = test_db().await;
        db.replace_anomaly_findings(&[
            finding("anm-1", "ent-000002", AnomalyKind::Volume),
            finding("anm-2", "ent-000001", AnomalyKind::Geographic),
        ])
        .await
        .unwrap();

        let listed = db.list_anomaly_findings(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].entity_id, "ent-000001");
        assert_eq!(listed[1].kind, AnomalyKind::Volume);
    }

    #[tokio::test]
    async fn replace_truncates_and_limit_applies() {
        let db = test_db().await;
        db.replace_anomaly_findings(&[finding("anm-1", "ent-000001", AnomalyKind::Volume)])
            .await
            .unwrap();
        db.replace_anomaly_findings(&[
            finding("anm-2", "ent-000001", AnomalyKind::Concentration),
            finding("anm-3", "ent-000002", AnomalyKind::FastApproval),
        ])
        .await
        .unwrap();

        let listed = db.list_anomaly_findings(1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "anm-2");
    }
}
