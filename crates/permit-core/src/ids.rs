//! ID prefix constants and formatting helpers.
//!
//! Entity ids are assigned sequentially by the resolver so identical input
//! produces identical ids within a run (ids are run-scoped, not stable across
//! reruns). Row ids for signals, anomaly findings, and run log entries are
//! random-suffixed and generated by the storage layer.

pub const PREFIX_ENTITY: &str = "ent";
pub const PREFIX_SIGNAL: &str = "sig";
pub const PREFIX_ANOMALY: &str = "anm";
pub const PREFIX_RUN: &str = "run";

pub const ALL_PREFIXES: [&str; 4] = [PREFIX_ENTITY, PREFIX_SIGNAL, PREFIX_ANOMALY, PREFIX_RUN];

/// Format a sequential entity id, e.g. `entity_id(42)` → `"ent-000042"`.
///
/// Zero-padded so lexicographic order matches assignment order; the graph
/// builder's `entity_a < entity_b` edge invariant depends on this.
#[must_use]
pub fn entity_id(seq: usize) -> String {
    format!("{PREFIX_ENTITY}-{seq:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_zero_padded() {
        assert_eq!(entity_id(0), "ent-000000");
        assert_eq!(entity_id(42), "ent-000042");
        assert_eq!(entity_id(123_456), "ent-123456");
    }

    #[test]
    fn entity_id_lexicographic_order_matches_numeric() {
        let a = entity_id(9);
        let b = entity_id(10);
        assert!(a < b);
    }
}
