//! # permit-resolve
//!
//! Entity resolution for permit contacts.
//!
//! City feeds mention the same party with different spellings, roles, and
//! licenses. This crate partitions every contact row into exactly one
//! resolved entity via a confidence-decreasing cascade: feed-native stable
//! ids, then license equality, then cross-feed exact names on a shared
//! permit, then blocked fuzzy name matching, then singleton fallback.
//!
//! The whole partition is built in memory and persisted in a single
//! transaction, replacing the previous run's entities wholesale. Identical
//! input produces identical entity ids within a run; ids are run-scoped,
//! not stable across reruns.

pub mod canonical;
pub mod cascade;
pub mod error;
pub mod normalize;
mod union;

use chrono::Utc;
use permit_config::ResolverConfig;
use permit_core::roles::RoleMap;
use permit_db::PermitDb;

pub use error::ResolveError;

/// Counts reported by a resolver run, recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveReport {
    pub contacts: usize,
    pub entities: usize,
}

/// Run the full resolution stage: load contacts in deterministic order,
/// build the partition, canonicalize, and replace the entity tables.
///
/// # Errors
///
/// Returns [`ResolveError`] if loading or persisting fails. The previous
/// entity tables survive a failed run untouched.
pub async fn run(
    db: &PermitDb,
    config: &ResolverConfig,
    roles: &RoleMap,
) -> Result<ResolveReport, ResolveError> {
    let contacts = db.fetch_contacts_ordered().await?;
    let groups = cascade::build_partition(&contacts, config, roles);
    let (entities, members) = canonical::canonicalize(&contacts, &groups, roles, Utc::now());
    db.replace_entities(&entities, &members).await?;

    let report = ResolveReport {
        contacts: contacts.len(),
        entities: entities.len(),
    };
    tracing::info!(
        contacts = report.contacts,
        entities = report.entities,
        "entity resolution complete"
    );
    Ok(report)
}
