//! Tagged enums for the permitgraph domain.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage. Source feeds express most of these as
//! inconsistent free text; the closed variants here are the only representation
//! the engine compares at runtime.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Confidence level of an entity, reflecting which resolver cascade step
/// created or last merged it.
///
/// Confidence is matching metadata, never an error state: every entity
/// carries one, including singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Stable identifier or license grouping (cascade steps 1–3).
    High,
    /// Cross-feed exact-name match on a shared permit (step 4).
    Medium,
    /// Fuzzy name match or singleton fallback (steps 5–6).
    Low,
}

impl Confidence {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceFeed
// ---------------------------------------------------------------------------

/// Government open-data feed a contact row was ingested from.
///
/// Feed strings the catalog does not recognize deserialize to [`Self::Unknown`]
/// rather than erroring, so one mislabeled row cannot abort a resolve run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceFeed {
    Building,
    Electrical,
    Plumbing,
    Boiler,
    Planning,
    #[serde(other)]
    Unknown,
}

impl SourceFeed {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Boiler => "boiler",
            Self::Planning => "planning",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// Resolved party type, derived from the most frequent normalized role
/// among an entity's contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Architect,
    Engineer,
    Contractor,
    Electrical,
    Plumbing,
    Mechanical,
    Owner,
    Agent,
    Attorney,
    Other,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Engineer => "engineer",
            Self::Contractor => "contractor",
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Mechanical => "mechanical",
            Self::Owner => "owner",
            Self::Agent => "agent",
            Self::Attorney => "attorney",
            Self::Other => "other",
        }
    }

    /// Trade roles carry historically higher naming variance across feeds,
    /// so the fuzzy matcher relaxes its similarity threshold for them.
    #[must_use]
    pub const fn is_trade(self) -> bool {
        matches!(
            self,
            Self::Contractor | Self::Engineer | Self::Electrical | Self::Plumbing | Self::Mechanical
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RiskTier
// ---------------------------------------------------------------------------

/// Ordered risk scale shared by signal severities and property health tiers.
///
/// ```text
/// on_track < slower < behind < at_risk < high_risk
/// ```
///
/// `Ord` follows variant declaration order; the health aggregator relies on
/// this when taking the max severity for a property.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    OnTrack,
    Slower,
    Behind,
    AtRisk,
    HighRisk,
}

impl RiskTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::Slower => "slower",
            Self::Behind => "behind",
            Self::AtRisk => "at_risk",
            Self::HighRisk => "high_risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SignalType
// ---------------------------------------------------------------------------

/// Fixed catalog of detectable risk conditions.
///
/// Each type carries a static severity tier and a compounding flag. The
/// compounding flag marks signal types that, when two or more distinct ones
/// co-occur at `at_risk` severity on one property, escalate the property to
/// `high_risk`. Informational types (open complaints, expired over-the-counter
/// permits) never compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Review comments issued, permit sitting on hold unresolved.
    HoldReviewComments,
    /// Planning review open past the staleness window.
    StalledPlanningReview,
    /// Any other review open past the staleness window.
    StalledGeneralReview,
    /// Notice of violation with no resolution date.
    OpenViolation,
    /// Violation escalated to abatement, still pending.
    PendingAbatement,
    /// Permit past expiration with no final inspection on record.
    ExpiredNoFinal,
    /// Long-idle permit while newer permits were filed on the same property.
    StaleRecentActivity,
    /// Expired permit whose only inspection activity was minor.
    ExpiredMinorActivity,
    /// Expired permit whose last inspection was inconclusive.
    ExpiredInconclusive,
    /// Expired over-the-counter permit, never finaled.
    ExpiredOtc,
    /// Long-idle permit with no inspection activity at all.
    StaleNoActivity,
    /// Complaint on file with no closure date.
    OpenComplaint,
}

impl SignalType {
    /// Every catalog member, in detector execution order.
    pub const ALL: [Self; 12] = [
        Self::HoldReviewComments,
        Self::StalledPlanningReview,
        Self::StalledGeneralReview,
        Self::OpenViolation,
        Self::PendingAbatement,
        Self::ExpiredNoFinal,
        Self::StaleRecentActivity,
        Self::ExpiredMinorActivity,
        Self::ExpiredInconclusive,
        Self::ExpiredOtc,
        Self::StaleNoActivity,
        Self::OpenComplaint,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HoldReviewComments => "hold_review_comments",
            Self::StalledPlanningReview => "stalled_planning_review",
            Self::StalledGeneralReview => "stalled_general_review",
            Self::OpenViolation => "open_violation",
            Self::PendingAbatement => "pending_abatement",
            Self::ExpiredNoFinal => "expired_no_final",
            Self::StaleRecentActivity => "stale_recent_activity",
            Self::ExpiredMinorActivity => "expired_minor_activity",
            Self::ExpiredInconclusive => "expired_inconclusive",
            Self::ExpiredOtc => "expired_otc",
            Self::StaleNoActivity => "stale_no_activity",
            Self::OpenComplaint => "open_complaint",
        }
    }

    /// Static severity tier for signals of this type.
    #[must_use]
    pub const fn severity(self) -> RiskTier {
        match self {
            Self::HoldReviewComments
            | Self::StalledPlanningReview
            | Self::OpenViolation
            | Self::PendingAbatement
            | Self::ExpiredNoFinal => RiskTier::AtRisk,
            Self::StalledGeneralReview
            | Self::StaleRecentActivity
            | Self::ExpiredInconclusive
            | Self::StaleNoActivity
            | Self::OpenComplaint => RiskTier::Behind,
            Self::ExpiredMinorActivity | Self::ExpiredOtc => RiskTier::Slower,
        }
    }

    /// Whether this type participates in the compounding escalation rule.
    #[must_use]
    pub const fn compounding(self) -> bool {
        !matches!(
            self,
            Self::ExpiredMinorActivity | Self::ExpiredOtc | Self::OpenComplaint
        )
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AnomalyKind
// ---------------------------------------------------------------------------

/// Statistical checks run by the network anomaly detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Permit count far above the median for the entity's kind.
    Volume,
    /// One inspector handling most of an entity's permits.
    Concentration,
    /// Permits concentrated in one neighborhood despite citywide scope.
    Geographic,
    /// High-cost permits approved unusually fast.
    FastApproval,
}

impl AnomalyKind {
    pub const ALL: [Self; 4] = [
        Self::Volume,
        Self::Concentration,
        Self::Geographic,
        Self::FastApproval,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Concentration => "concentration",
            Self::Geographic => "geographic",
            Self::FastApproval => "fast_approval",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineStage
// ---------------------------------------------------------------------------

/// Batch pipeline stages, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Resolve,
    Graph,
    Anomalies,
    Signals,
    Health,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Graph => "graph",
            Self::Anomalies => "anomalies",
            Self::Signals => "signals",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected_str:expr) => {
            #[test]
            fn $name() {
                let val = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, format!("\"{}\"", $expected_str));
                let recovered: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(recovered, val);
            }
        };
    }

    test_serde_roundtrip!(confidence_high, Confidence, Confidence::High, "high");
    test_serde_roundtrip!(confidence_low, Confidence, Confidence::Low, "low");

    test_serde_roundtrip!(feed_building, SourceFeed, SourceFeed::Building, "building");
    test_serde_roundtrip!(feed_boiler, SourceFeed, SourceFeed::Boiler, "boiler");

    #[test]
    fn unrecognized_feed_falls_back_to_unknown() {
        let feed: SourceFeed = serde_json::from_str("\"fire\"").unwrap();
        assert_eq!(feed, SourceFeed::Unknown);
        assert_eq!(feed.as_str(), "unknown");
    }

    test_serde_roundtrip!(kind_architect, EntityKind, EntityKind::Architect, "architect");
    test_serde_roundtrip!(kind_electrical, EntityKind, EntityKind::Electrical, "electrical");

    test_serde_roundtrip!(tier_on_track, RiskTier, RiskTier::OnTrack, "on_track");
    test_serde_roundtrip!(tier_high_risk, RiskTier, RiskTier::HighRisk, "high_risk");

    test_serde_roundtrip!(
        signal_open_violation,
        SignalType,
        SignalType::OpenViolation,
        "open_violation"
    );
    test_serde_roundtrip!(
        signal_stalled_planning,
        SignalType,
        SignalType::StalledPlanningReview,
        "stalled_planning_review"
    );
    test_serde_roundtrip!(
        signal_expired_otc,
        SignalType,
        SignalType::ExpiredOtc,
        "expired_otc"
    );

    test_serde_roundtrip!(
        anomaly_fast_approval,
        AnomalyKind,
        AnomalyKind::FastApproval,
        "fast_approval"
    );

    test_serde_roundtrip!(stage_resolve, PipelineStage, PipelineStage::Resolve, "resolve");

    #[test]
    fn risk_tier_ordering() {
        assert!(RiskTier::OnTrack < RiskTier::Slower);
        assert!(RiskTier::Slower < RiskTier::Behind);
        assert!(RiskTier::Behind < RiskTier::AtRisk);
        assert!(RiskTier::AtRisk < RiskTier::HighRisk);
        assert_eq!(
            [RiskTier::Behind, RiskTier::HighRisk, RiskTier::Slower]
                .into_iter()
                .max(),
            Some(RiskTier::HighRisk)
        );
    }

    #[test]
    fn trade_kinds() {
        assert!(EntityKind::Electrical.is_trade());
        assert!(EntityKind::Contractor.is_trade());
        assert!(EntityKind::Engineer.is_trade());
        assert!(!EntityKind::Architect.is_trade());
        assert!(!EntityKind::Owner.is_trade());
    }

    #[test]
    fn informational_signals_never_compound() {
        assert!(!SignalType::OpenComplaint.compounding());
        assert!(!SignalType::ExpiredOtc.compounding());
        assert!(!SignalType::ExpiredMinorActivity.compounding());
        assert!(SignalType::OpenViolation.compounding());
        assert!(SignalType::StalledPlanningReview.compounding());
    }

    #[test]
    fn signal_catalog_is_complete() {
        assert_eq!(SignalType::ALL.len(), 12);
        for ty in SignalType::ALL {
            // Every member serializes to its as_str form.
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", Confidence::Medium), "medium");
        assert_eq!(format!("{}", SourceFeed::Electrical), "electrical");
        assert_eq!(format!("{}", EntityKind::Plumbing), "plumbing");
        assert_eq!(format!("{}", RiskTier::AtRisk), "at_risk");
        assert_eq!(format!("{}", SignalType::ExpiredNoFinal), "expired_no_final");
        assert_eq!(format!("{}", AnomalyKind::Concentration), "concentration");
        assert_eq!(format!("{}", PipelineStage::Health), "health");
    }
}
