//! Record structs for raw and derived tables.
//!
//! Raw rows (`Contact`, `Permit`) are owned by the external ingestion jobs
//! and read-only inside the engine; inspections, violations, and complaints
//! are consumed through set-based SQL only and never materialize as structs.
//! Derived rows are rebuilt from scratch on every run and form the wire
//! contract read by external reporting surfaces, hence the `JsonSchema`
//! derives.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    AnomalyKind, Confidence, EntityKind, PipelineStage, RiskTier, SignalType, SourceFeed,
};

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One per-feed, per-permit mention of a named party. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: i64,
    pub source_feed: SourceFeed,
    pub permit_ref: String,
    pub name: Option<String>,
    pub firm: Option<String>,
    pub role: Option<String>,
    pub license_no: Option<String>,
    pub business_license_no: Option<String>,
    /// Feed-native stable identifier, present on some feeds only.
    pub source_ref: Option<String>,
}

/// A permit row as ingested from the open-data feeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permit {
    pub permit_ref: String,
    /// Block/lot property key.
    pub property_key: String,
    pub permit_type: Option<String>,
    pub status: Option<String>,
    pub status_date: Option<NaiveDate>,
    pub filed_date: Option<NaiveDate>,
    pub approved_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub estimated_cost: Option<f64>,
    pub neighborhood: Option<String>,
    pub is_otc: bool,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived rows
// ---------------------------------------------------------------------------

/// A resolved real-world party built from one or more contacts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    pub canonical_name: String,
    pub canonical_firm: Option<String>,
    pub entity_kind: EntityKind,
    /// All distinct normalized roles observed across the entity's contacts.
    pub roles: Vec<EntityKind>,
    pub confidence: Confidence,
    pub contact_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Co-occurrence edge between two entities sharing at least one permit.
///
/// Invariant: `entity_a < entity_b`; exactly one row per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Relationship {
    pub entity_a: String,
    pub entity_b: String,
    pub shared_permits: u32,
    /// Capped sample of shared permit references.
    pub permit_refs: Vec<String>,
    pub permit_types: Vec<String>,
    pub first_seen: Option<NaiveDate>,
    pub last_seen: Option<NaiveDate>,
    pub total_cost: f64,
    pub neighborhoods: Vec<String>,
}

/// One detected risk condition attached to a property.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Signal {
    pub id: String,
    pub signal_type: SignalType,
    pub severity: RiskTier,
    pub compounding: bool,
    pub property_key: String,
    pub permit_ref: Option<String>,
    pub detail: String,
    pub detected_at: DateTime<Utc>,
}

/// Final health classification for one property, derived purely from its
/// current signal set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PropertyHealth {
    pub property_key: String,
    pub tier: RiskTier,
    pub reason: String,
    pub computed_at: DateTime<Utc>,
}

/// A flagged statistical finding about an entity. Lighter weight than a
/// signal; consumed ad hoc rather than feeding the health tiers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AnomalyFinding {
    pub id: String,
    pub entity_id: String,
    pub kind: AnomalyKind,
    pub detail: String,
    pub detected_at: DateTime<Utc>,
}

/// One pipeline stage execution, recorded for the external scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RunRecord {
    pub id: String,
    pub stage: PipelineStage,
    /// `ok` or `failed`.
    pub status: String,
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_serializes_with_snake_case_enums() {
        let entity = Entity {
            id: "ent-000001".into(),
            canonical_name: "ACME ELECTRIC INC".into(),
            canonical_firm: None,
            entity_kind: EntityKind::Electrical,
            roles: vec![EntityKind::Electrical, EntityKind::Contractor],
            confidence: Confidence::High,
            contact_count: 4,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entity_kind"], "electrical");
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["roles"][1], "contractor");
    }

    #[test]
    fn signal_roundtrip() {
        let signal = Signal {
            id: "sig-a3f8b2c1".into(),
            signal_type: SignalType::OpenViolation,
            severity: SignalType::OpenViolation.severity(),
            compounding: true,
            property_key: "3512/042".into(),
            permit_ref: Some("202301015555".into()),
            detail: "notice of violation open since 2023-04-01".into(),
            detected_at: Utc::now(),
        };
        let json = serde_json::to_string(&signal).unwrap();
        let back: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signal);
        assert_eq!(back.severity, RiskTier::AtRisk);
    }
}
