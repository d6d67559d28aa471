//! Raw role string → [`EntityKind`] normalization.
//!
//! Source feeds carry the party role as inconsistent free text
//! (`"Electrical Contractor"`, `"elec. contr"`, `"ARCHITECT OF RECORD"`).
//! `RoleMap` is the single place that text is interpreted; it is passed into
//! the resolver explicitly so tests can substitute their own table.

use std::collections::HashMap;

use crate::enums::EntityKind;

/// Explicit mapping from normalized raw role strings to entity kinds.
#[derive(Debug, Clone)]
pub struct RoleMap {
    exact: HashMap<String, EntityKind>,
}

impl RoleMap {
    /// Build the built-in mapping covering the role spellings observed across
    /// the city feeds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut exact = HashMap::new();
        let table: &[(&str, EntityKind)] = &[
            ("architect", EntityKind::Architect),
            ("architect of record", EntityKind::Architect),
            ("design professional", EntityKind::Architect),
            ("engineer", EntityKind::Engineer),
            ("civil engineer", EntityKind::Engineer),
            ("structural engineer", EntityKind::Engineer),
            ("professional engineer", EntityKind::Engineer),
            ("contractor", EntityKind::Contractor),
            ("general contractor", EntityKind::Contractor),
            ("gen contractor", EntityKind::Contractor),
            ("builder", EntityKind::Contractor),
            ("electrical", EntityKind::Electrical),
            ("electrical contractor", EntityKind::Electrical),
            ("electrician", EntityKind::Electrical),
            ("elec contr", EntityKind::Electrical),
            ("plumbing", EntityKind::Plumbing),
            ("plumbing contractor", EntityKind::Plumbing),
            ("plumber", EntityKind::Plumbing),
            ("mechanical", EntityKind::Mechanical),
            ("mechanical contractor", EntityKind::Mechanical),
            ("hvac contractor", EntityKind::Mechanical),
            ("owner", EntityKind::Owner),
            ("property owner", EntityKind::Owner),
            ("owner builder", EntityKind::Owner),
            ("agent", EntityKind::Agent),
            ("authorized agent", EntityKind::Agent),
            ("permit consultant", EntityKind::Agent),
            ("expediter", EntityKind::Agent),
            ("attorney", EntityKind::Attorney),
            ("attorney in fact", EntityKind::Attorney),
        ];
        for (raw, kind) in table {
            exact.insert((*raw).to_string(), *kind);
        }
        Self { exact }
    }

    /// Normalize a raw role string and look up its kind.
    ///
    /// Unknown or empty roles map to [`EntityKind::Other`] rather than
    /// failing; role interpretation is never a reason to drop a contact.
    #[must_use]
    pub fn classify(&self, raw: &str) -> EntityKind {
        let key = normalize_role(raw);
        if key.is_empty() {
            return EntityKind::Other;
        }
        if let Some(kind) = self.exact.get(&key) {
            return *kind;
        }
        // Fall back on keyword containment for compound spellings like
        // "licensed electrical contractor (c-10)".
        if key.contains("electric") {
            EntityKind::Electrical
        } else if key.contains("plumb") {
            EntityKind::Plumbing
        } else if key.contains("mechanical") || key.contains("hvac") {
            EntityKind::Mechanical
        } else if key.contains("architect") {
            EntityKind::Architect
        } else if key.contains("engineer") {
            EntityKind::Engineer
        } else if key.contains("contractor") || key.contains("builder") {
            EntityKind::Contractor
        } else if key.contains("owner") {
            EntityKind::Owner
        } else if key.contains("agent") || key.contains("expedit") {
            EntityKind::Agent
        } else if key.contains("attorney") {
            EntityKind::Attorney
        } else {
            EntityKind::Other
        }
    }
}

impl Default for RoleMap {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
#[must_use]
pub fn normalize_role(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.truncate(out.trim_end().len());
    out
}
