//! Signal repository — the detector bank's output rows.

use permit_core::records::Signal;

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum};

pub(crate) fn row_to_signal(row: &libsql::Row) -> Result<Signal, DatabaseError> {
    Ok(Signal {
        id: row.get::<String>(0)?,
        signal_type: parse_enum(&row.get::<String>(1)?)?,
        severity: parse_enum(&row.get::<String>(2)?)?,
        compounding: row.get::<i64>(3)? != 0,
        property_key: row.get::<String>(4)?,
        permit_ref: get_opt_string(row, 5)?,
        detail: row.get::<String>(6)?,
        detected_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

const SIGNAL_COLUMNS: &str =
    "id, signal_type, severity, compounding, property_key, permit_ref, detail, detected_at";

impl PermitDb {
    /// Replace the signal table with a fresh detector-bank run, atomically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` on any write failure; rolls back on drop.
    pub async fn replace_signals(&self, signals: &[Signal]) -> Result<(), DatabaseError> {
        let tx = self.conn().transaction().await?;
        tx.execute("DELETE FROM signals", ()).await?;

        for signal in signals {
            tx.execute(
                "INSERT INTO signals (id, signal_type, severity, compounding, property_key, permit_ref, detail, detected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                libsql::params![
                    signal.id.as_str(),
                    signal.signal_type.as_str(),
                    signal.severity.as_str(),
                    i64::from(signal.compounding),
                    signal.property_key.as_str(),
                    signal.permit_ref.as_deref(),
                    signal.detail.as_str(),
                    signal.detected_at.to_rfc3339()
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch every current signal, ordered by property then type.
    ///
    /// The health aggregator consumes this; the ordering keeps its reason
    /// strings reproducible.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn list_signals(&self) -> Result<Vec<Signal>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SIGNAL_COLUMNS} FROM signals ORDER BY property_key, signal_type, id"
                ),
                (),
            )
            .await?;

        let mut signals = Vec::new();
        while let Some(row) = rows.next().await? {
            signals.push(row_to_signal(&row)?);
        }
        Ok(signals)
    }

    /// Fetch the current signals for one property.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn signals_for_property(
        &self,
        property_key: &str,
    ) -> Result<Vec<Signal>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SIGNAL_COLUMNS} FROM signals WHERE property_key = ?1
                     ORDER BY signal_type, id"
                ),
                [property_key],
            )
            .await?;

        let mut signals = Vec::new();
        while let Some(row) = rows.next().await? {
            signals.push(row_to_signal(&row)?);
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use permit_core::enums::SignalType;

    async fn test_db() -> PermitDb {
        PermitDb::open_local(":memory:").await.unwrap()
    }

    fn signal(id: &str, ty: SignalType, property_key: &str) -> Signal {
        Signal {
            id: id.into(),
            signal_type: ty,
            severity: ty.severity(),
            compounding: ty.compounding(),
            property_key: property_key.into(),
            permit_ref: None,
            detail: format!("{ty} detected"),
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replace_and_query_by_property() {
        let db = test_db().await;
        db.replace_signals(&[
            signal("sig-1", SignalType::OpenViolation, "3512/042"),
            signal("sig-2", SignalType::OpenComplaint, "3512/042"),
            signal("sig-3", SignalType::ExpiredOtc, "0001/001"),
        ])
        .await
        .unwrap();

        let for_prop = db.signals_for_property("3512/042").await.unwrap();
        assert_eq!(for_prop.len(), 2);
        assert!(for_prop.iter().all(|s| s.property_key == "3512/042"));

        let all = db.list_signals().await.unwrap();
        assert_eq!(all.len(), 3);
        // Ordered by property first
        assert_eq!(all[0].property_key, "0001/001");
    }

    #[tokio::test]
    async fn replace_truncates_previous_run() {
        let db = test_db().await;
        db.replace_signals(&[signal("sig-1", SignalType::OpenViolation, "3512/042")])
            .await
            .unwrap();
        db.replace_signals(&[signal("sig-9", SignalType::StaleNoActivity, "3512/042")])
            .await
            .unwrap();

        let all = db.list_signals().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].signal_type, SignalType::StaleNoActivity);
    }

    #[tokio::test]
    async fn severity_and_compounding_roundtrip() {
        let db = test_db().await;
        db.replace_signals(&[signal("sig-1", SignalType::OpenComplaint, "P")])
            .await
            .unwrap();
        let all = db.list_signals().await.unwrap();
        assert!(!all[0].compounding);
        assert_eq!(all[0].severity, SignalType::OpenComplaint.severity());
    }
}
