//! Property health aggregation.
//!
//! A pure function of the current signal set. The base tier per property
//! is the maximum severity among its signals; two or more distinct
//! compounding signal types at `at_risk` or higher escalate the property
//! to `high_risk`. Non-compounding types never participate in escalation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use permit_core::enums::{RiskTier, SignalType};
use permit_core::records::{PropertyHealth, Signal};
use permit_db::PermitDb;

use crate::error::SignalError;

/// Counts reported by an aggregation pass, recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub properties: usize,
}

/// Derive one health row per property from the signal set.
///
/// Properties with no signals get no row; absence reads as on-track.
/// Recomputation over an unchanged signal set is bit-identical apart from
/// the supplied timestamp.
#[must_use]
pub fn aggregate(signals: &[Signal], computed_at: DateTime<Utc>) -> Vec<PropertyHealth> {
    let mut by_property: BTreeMap<&str, Vec<&Signal>> = BTreeMap::new();
    for signal in signals {
        by_property
            .entry(signal.property_key.as_str())
            .or_default()
            .push(signal);
    }

    by_property
        .into_iter()
        .map(|(property_key, signals)| {
            let base = signals
                .iter()
                .map(|s| s.severity)
                .max()
                .unwrap_or(RiskTier::OnTrack);

            let mut compounding_types: Vec<SignalType> = signals
                .iter()
                .filter(|s| s.compounding && s.severity >= RiskTier::AtRisk)
                .map(|s| s.signal_type)
                .collect();
            compounding_types.sort_by_key(|t| t.as_str());
            compounding_types.dedup();

            let (tier, reason) = if compounding_types.len() >= 2 {
                let names: Vec<&str> = compounding_types.iter().map(|t| t.as_str()).collect();
                (
                    RiskTier::HighRisk,
                    format!("compounding: {}", names.join(" + ")),
                )
            } else {
                let mut driving: Vec<&str> = signals
                    .iter()
                    .filter(|s| s.severity == base)
                    .map(|s| s.signal_type.as_str())
                    .collect();
                driving.sort_unstable();
                driving.dedup();
                (base, driving.join(" + "))
            };

            PropertyHealth {
                property_key: property_key.to_string(),
                tier,
                reason,
                computed_at,
            }
        })
        .collect()
}

/// Run the aggregation stage: load the current signal set, derive the
/// health rows, and replace the table.
///
/// # Errors
///
/// Returns [`SignalError`] if loading or persisting fails.
pub async fn run(db: &PermitDb, computed_at: DateTime<Utc>) -> Result<HealthReport, SignalError> {
    let signals = db.list_signals().await?;
    let rows = aggregate(&signals, computed_at);
    db.replace_property_health(&rows).await?;

    let report = HealthReport {
        properties: rows.len(),
    };
    tracing::info!(properties = report.properties, "property health recomputed");
    Ok(report)
}
