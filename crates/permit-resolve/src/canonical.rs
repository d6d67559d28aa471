//! Partition → entity rows.
//!
//! Assigns sequential ids from the sorted partition and picks canonical
//! fields per group: longest observed name and firm, most frequent role as
//! the kind, the full role set for the record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use permit_core::enums::EntityKind;
use permit_core::ids::entity_id;
use permit_core::records::{Contact, Entity};
use permit_core::roles::RoleMap;

use crate::cascade::Group;

/// Longest non-null value among the group's observations. Earliest mention
/// wins ties, so the pick is stable across runs.
fn longest<'a>(
    contacts: &'a [Contact],
    members: &[usize],
    field: impl Fn(&Contact) -> Option<&str>,
) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for &i in members {
        if let Some(value) = field(&contacts[i]) {
            if value.is_empty() {
                continue;
            }
            if best.is_none_or(|b| value.chars().count() > b.chars().count()) {
                best = Some(value);
            }
        }
    }
    best
}

/// Most frequent normalized role across the group, earliest observation
/// breaking ties. Groups with no role text at all are `Other`.
fn dominant_kind(contacts: &[Contact], members: &[usize], roles: &RoleMap) -> EntityKind {
    let mut counts: HashMap<EntityKind, (usize, usize)> = HashMap::new();
    for (order, &i) in members.iter().enumerate() {
        let Some(raw) = contacts[i].role.as_deref() else {
            continue;
        };
        let kind = roles.classify(raw);
        let entry = counts.entry(kind).or_insert((0, order));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, order_a)), (_, (count_b, order_b))| {
            count_a.cmp(count_b).then(order_b.cmp(order_a))
        })
        .map_or(EntityKind::Other, |(kind, _)| kind)
}

fn role_set(contacts: &[Contact], members: &[usize], roles: &RoleMap) -> Vec<EntityKind> {
    let mut set: Vec<EntityKind> = members
        .iter()
        .filter_map(|&i| contacts[i].role.as_deref())
        .map(|raw| roles.classify(raw))
        .collect();
    set.sort_by_key(|kind| kind.as_str());
    set.dedup();
    set
}

/// Build the entity rows and the contact membership pairs from a finished
/// partition. Ids are sequential in partition order, starting at 1.
#[must_use]
pub fn canonicalize(
    contacts: &[Contact],
    groups: &[Group],
    roles: &RoleMap,
    now: DateTime<Utc>,
) -> (Vec<Entity>, Vec<(String, i64)>) {
    let mut entities = Vec::with_capacity(groups.len());
    let mut members = Vec::with_capacity(contacts.len());

    for (seq, group) in groups.iter().enumerate() {
        let id = entity_id(seq + 1);

        let canonical_name = longest(contacts, &group.members, |c| c.name.as_deref())
            .or_else(|| longest(contacts, &group.members, |c| c.firm.as_deref()))
            .unwrap_or("unknown")
            .to_string();
        let canonical_firm =
            longest(contacts, &group.members, |c| c.firm.as_deref()).map(String::from);

        entities.push(Entity {
            id: id.clone(),
            canonical_name,
            canonical_firm,
            entity_kind: dominant_kind(contacts, &group.members, roles),
            roles: role_set(contacts, &group.members, roles),
            confidence: group.confidence,
            contact_count: u32::try_from(group.members.len()).unwrap_or(u32::MAX),
            created_at: now,
        });

        for &i in &group.members {
            members.push((id.clone(), contacts[i].id));
        }
    }

    (entities, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_core::enums::{Confidence, SourceFeed};
    use pretty_assertions::assert_eq;

    fn contact(id: i64, name: &str, firm: Option<&str>, role: Option<&str>) -> Contact {
        Contact {
            id,
            source_feed: SourceFeed::Building,
            permit_ref: "P1".into(),
            name: (!name.is_empty()).then(|| name.to_string()),
            firm: firm.map(String::from),
            role: role.map(String::from),
            license_no: None,
            business_license_no: None,
            source_ref: None,
        }
    }

    #[test]
    fn canonical_fields_from_group() {
        let contacts = vec![
            contact(10, "ACME", Some("ACME GROUP"), Some("Electrician")),
            contact(
                11,
                "ACME ELECTRIC INCORPORATED",
                None,
                Some("Electrical Contractor"),
            ),
            contact(12, "ACME ELEC", Some("ACME GROUP LLC"), Some("Owner")),
        ];
        let groups = vec![Group {
            members: vec![0, 1, 2],
            confidence: Confidence::High,
        }];

        let (entities, members) =
            canonicalize(&contacts, &groups, &RoleMap::builtin(), Utc::now());

        assert_eq!(entities.len(), 1);
        let entity = &entities[0];
        assert_eq!(entity.id, "ent-000001");
        assert_eq!(entity.canonical_name, "ACME ELECTRIC INCORPORATED");
        assert_eq!(entity.canonical_firm.as_deref(), Some("ACME GROUP LLC"));
        assert_eq!(entity.entity_kind, EntityKind::Electrical);
        assert_eq!(entity.roles, vec![EntityKind::Electrical, EntityKind::Owner]);
        assert_eq!(entity.contact_count, 3);

        let expected: Vec<(String, i64)> = vec![
            ("ent-000001".into(), 10),
            ("ent-000001".into(), 11),
            ("ent-000001".into(), 12),
        ];
        assert_eq!(members, expected);
    }

    #[test]
    fn role_set_is_sorted_and_deduped() {
        let contacts = vec![
            contact(1, "X", None, Some("Owner")),
            contact(2, "X", None, Some("Architect")),
            contact(3, "X", None, Some("owner/agent")),
            contact(4, "X", None, Some("Architect")),
        ];
        let groups = vec![Group {
            members: vec![0, 1, 2, 3],
            confidence: Confidence::Low,
        }];

        let (entities, _) = canonicalize(&contacts, &groups, &RoleMap::builtin(), Utc::now());
        assert_eq!(
            entities[0].roles,
            vec![EntityKind::Architect, EntityKind::Owner]
        );
    }

    #[test]
    fn nameless_group_falls_back_to_firm_then_unknown() {
        let contacts = vec![
            contact(1, "", Some("SHELL FIRM LLC"), None),
            contact(2, "", None, None),
        ];
        let groups = vec![
            Group {
                members: vec![0],
                confidence: Confidence::Low,
            },
            Group {
                members: vec![1],
                confidence: Confidence::Low,
            },
        ];

        let (entities, _) = canonicalize(&contacts, &groups, &RoleMap::builtin(), Utc::now());
        assert_eq!(entities[0].canonical_name, "SHELL FIRM LLC");
        assert_eq!(entities[0].entity_kind, EntityKind::Other);
        assert_eq!(entities[1].canonical_name, "unknown");
        assert!(entities[1].roles.is_empty());
    }

    #[test]
    fn sequential_ids_follow_partition_order() {
        let contacts = vec![contact(1, "A", None, None), contact(2, "B", None, None)];
        let groups = vec![
            Group {
                members: vec![0],
                confidence: Confidence::Low,
            },
            Group {
                members: vec![1],
                confidence: Confidence::Low,
            },
        ];
        let (entities, _) = canonicalize(&contacts, &groups, &RoleMap::builtin(), Utc::now());
        assert_eq!(entities[0].id, "ent-000001");
        assert_eq!(entities[1].id, "ent-000002");
        assert!(entities[0].id < entities[1].id);
    }
}
