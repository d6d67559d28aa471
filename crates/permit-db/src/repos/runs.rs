//! Run log repository.
//!
//! One row per pipeline stage execution. The external scheduler reads this
//! to alert on failed stages; unlike the other derived tables it is
//! append-only history, not truncate-and-recompute.

use chrono::{DateTime, Utc};
use permit_core::enums::PipelineStage;
use permit_core::ids::PREFIX_RUN;
use permit_core::records::RunRecord;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};

fn row_to_run(row: &libsql::Row) -> Result<RunRecord, DatabaseError> {
    Ok(RunRecord {
        id: row.get::<String>(0)?,
        stage: parse_enum(&row.get::<String>(1)?)?,
        status: row.get::<String>(2)?,
        detail: get_opt_string(row, 3)?,
        started_at: parse_datetime(&row.get::<String>(4)?)?,
        finished_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl PermitDb {
    /// Append a stage execution record and return it.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn record_run(
        &self,
        stage: PipelineStage,
        status: &str,
        detail: Option<&str>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<RunRecord, DatabaseError> {
        let id = self.generate_id(PREFIX_RUN).await?;
        self.conn()
            .execute(
                "INSERT INTO run_log (id, stage, status, detail, started_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    stage.as_str(),
                    status,
                    detail,
                    started_at.to_rfc3339(),
                    finished_at.to_rfc3339()
                ],
            )
            .await?;

        Ok(RunRecord {
            id,
            stage,
            status: status.to_string(),
            detail: detail.map(String::from),
            started_at,
            finished_at,
        })
    }

    /// Fetch recent stage executions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn run_history(&self, limit: u32) -> Result<Vec<RunRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, stage, status, detail, started_at, finished_at FROM run_log
                 ORDER BY started_at DESC, id DESC LIMIT ?1",
                [i64::from(limit)],
            )
            .await?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_run(&row)?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> PermitDb {
        PermitDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn record_and_list_runs() {
        let db = test_db().await;
        let started = Utc::now();
        let run = db
            .record_run(
                PipelineStage::Resolve,
                "ok",
                Some("entities=12 contacts=40"),
                started,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(run.id.starts_with("run-"));

        let history = db.run_history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, PipelineStage::Resolve);
        assert_eq!(history[0].status, "ok");
        assert_eq!(history[0].detail.as_deref(), Some("entities=12 contacts=40"));
    }

    #[tokio::test]
    async fn failed_stage_is_recorded() {
        let db = test_db().await;
        db.record_run(
            PipelineStage::Signals,
            "failed",
            Some("storage unavailable"),
            Utc::now(),
            Utc::now(),
        )
        .await
        .unwrap();

        let history = db.run_history(10).await.unwrap();
        assert_eq!(history[0].status, "failed");
    }
}
