//! Detector bank runner.

use chrono::{DateTime, Utc};
use permit_config::SignalConfig;
use permit_core::enums::SignalType;
use permit_core::ids::PREFIX_SIGNAL;
use permit_core::records::Signal;
use permit_db::PermitDb;

use crate::detectors::detect_one;
use crate::error::SignalError;

/// Outcome of a detector bank run, recorded in the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalReport {
    pub signals: usize,
    /// Detectors that errored and contributed nothing this run.
    pub failed_detectors: Vec<SignalType>,
}

/// Run every detector against the raw tables as of the given instant and
/// replace the signals table with the combined output.
///
/// A detector failure is captured per-detector: it is logged, reported,
/// and its rows are simply absent, while all other detectors still
/// persist. Only a storage failure while writing aborts the stage.
///
/// # Errors
///
/// Returns [`SignalError`] if assigning ids or the transactional replace
/// fails. The previous signal set survives a failed run untouched.
pub async fn run(
    db: &PermitDb,
    config: &SignalConfig,
    as_of: DateTime<Utc>,
) -> Result<SignalReport, SignalError> {
    let as_of_date = as_of.date_naive();

    let mut drafts = Vec::new();
    let mut failed_detectors = Vec::new();
    for signal_type in SignalType::ALL {
        match detect_one(db, signal_type, as_of_date, config).await {
            Ok(found) => drafts.extend(found),
            Err(error) => {
                tracing::warn!(detector = %signal_type, %error, "signal detector failed, skipping");
                failed_detectors.push(signal_type);
            }
        }
    }

    let mut signals = Vec::with_capacity(drafts.len());
    for draft in drafts {
        signals.push(Signal {
            id: db.generate_id(PREFIX_SIGNAL).await?,
            signal_type: draft.signal_type,
            severity: draft.signal_type.severity(),
            compounding: draft.signal_type.compounding(),
            property_key: draft.property_key,
            permit_ref: draft.permit_ref,
            detail: draft.detail,
            detected_at: as_of,
        });
    }
    db.replace_signals(&signals).await?;

    let report = SignalReport {
        signals: signals.len(),
        failed_detectors,
    };
    tracing::info!(
        signals = report.signals,
        failed = report.failed_detectors.len(),
        "signal detection complete"
    );
    Ok(report)
}
