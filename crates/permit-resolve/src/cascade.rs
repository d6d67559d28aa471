//! The matching cascade: contacts in, partition out.
//!
//! Steps run in confidence-decreasing order. Steps 1 through 4 merge on
//! hard keys; step 5 fuzzy-matches whatever is still unassigned; step 6 is
//! the singleton fallback. The cascade never fails on a contact: a
//! malformed or null-heavy row simply falls through the steps and ends up
//! a low-confidence singleton.

use std::collections::{BTreeMap, HashMap};

use permit_config::ResolverConfig;
use permit_core::enums::{Confidence, SourceFeed};
use permit_core::records::Contact;
use permit_core::roles::RoleMap;

use crate::normalize::{blocking_key, jaccard, name_tokens, normalize_license, normalize_name};
use crate::union::UnionFind;

/// One group of the final partition. `members` are indices into the input
/// contact slice, in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub members: Vec<usize>,
    pub confidence: Confidence,
}

const fn confidence_rank(c: Confidence) -> u8 {
    match c {
        Confidence::Low => 0,
        Confidence::Medium => 1,
        Confidence::High => 2,
    }
}

fn best_confidence(a: Confidence, b: Confidence) -> Confidence {
    if confidence_rank(a) >= confidence_rank(b) {
        a
    } else {
        b
    }
}

// Free function over the mutable cascade fields so callers can keep
// borrows of the contact and name slices alive across a merge.
fn merge(
    uf: &mut UnionFind,
    confidence: &mut [Confidence],
    a: usize,
    b: usize,
    step_confidence: Confidence,
) {
    let conf_a = confidence[uf.find(a)];
    let conf_b = confidence[uf.find(b)];
    let root = uf.union(a, b);
    confidence[root] = best_confidence(best_confidence(conf_a, conf_b), step_confidence);
}

struct Cascade<'a> {
    contacts: &'a [Contact],
    uf: UnionFind,
    // Indexed by contact; only the root's entry is meaningful.
    confidence: Vec<Confidence>,
    normalized_names: Vec<String>,
}

impl<'a> Cascade<'a> {
    fn new(contacts: &'a [Contact]) -> Self {
        let normalized_names = contacts
            .iter()
            .map(|c| normalize_name(c.name.as_deref().unwrap_or_default()))
            .collect();
        Self {
            contacts,
            uf: UnionFind::new(contacts.len()),
            confidence: vec![Confidence::Low; contacts.len()],
            normalized_names,
        }
    }

    /// Step 1: contacts sharing a feed-native stable identifier are the
    /// same party by definition.
    fn group_by_source_ref(&mut self) {
        let mut seen: HashMap<(SourceFeed, &str), usize> = HashMap::new();
        for (i, contact) in self.contacts.iter().enumerate() {
            let Some(source_ref) = contact.source_ref.as_deref() else {
                continue;
            };
            if source_ref.is_empty() {
                continue;
            }
            match seen.get(&(contact.source_feed, source_ref)) {
                Some(&first) => merge(&mut self.uf, &mut self.confidence, first, i, Confidence::High),
                None => {
                    seen.insert((contact.source_feed, source_ref), i);
                }
            }
        }
    }

    /// Steps 2 and 3: normalized license equality merges across all feeds,
    /// unioning previously-formed groups.
    fn group_by_license_field(&mut self, field: impl Fn(&Contact) -> Option<&str>) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (i, contact) in self.contacts.iter().enumerate() {
            let Some(raw) = field(contact) else { continue };
            let key = normalize_license(raw);
            if key.is_empty() {
                continue;
            }
            match seen.get(&key) {
                Some(&first) => merge(&mut self.uf, &mut self.confidence, first, i, Confidence::High),
                None => {
                    seen.insert(key, i);
                }
            }
        }
    }

    /// Step 4: equal normalized names on the same permit merge, but only
    /// when the mentions come from different source feeds. Same-feed
    /// duplicates on one permit are distinct rows until a cross-feed
    /// mention bridges them.
    fn group_by_exact_name_same_permit(&mut self) {
        let mut by_key: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
        for (i, contact) in self.contacts.iter().enumerate() {
            let name = self.normalized_names[i].as_str();
            if name.is_empty() {
                continue;
            }
            by_key
                .entry((contact.permit_ref.as_str(), name))
                .or_default()
                .push(i);
        }

        for group in by_key.values() {
            let multi_feed = group
                .iter()
                .any(|&i| self.contacts[i].source_feed != self.contacts[group[0]].source_feed);
            if multi_feed {
                for window in group.windows(2) {
                    merge(
                        &mut self.uf,
                        &mut self.confidence,
                        window[0],
                        window[1],
                        Confidence::Medium,
                    );
                }
            }
        }
    }

    /// Step 5: fuzzy-match contacts still unassigned after the hard-key
    /// steps. Blocking by normalized-name prefix keeps the pairwise
    /// comparison tractable; within a block every unassigned contact is
    /// compared against every other member.
    fn fuzzy_match(&mut self, config: &ResolverConfig, roles: &RoleMap) {
        // BTreeMap so blocks are visited in a stable order.
        let mut blocks: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for i in 0..self.contacts.len() {
            if let Some(key) = blocking_key(&self.normalized_names[i], config.blocking_prefix_len) {
                blocks.entry(key).or_default().push(i);
            }
        }

        let is_trade: Vec<bool> = self
            .contacts
            .iter()
            .map(|c| {
                c.role
                    .as_deref()
                    .is_some_and(|r| roles.classify(r).is_trade())
            })
            .collect();

        for block in blocks.values() {
            for &i in block {
                if self.uf.group_size(i) > 1 {
                    continue;
                }
                let tokens_i = name_tokens(&self.normalized_names[i]);
                for &j in block {
                    if i == j || self.uf.find(i) == self.uf.find(j) {
                        continue;
                    }
                    let tokens_j = name_tokens(&self.normalized_names[j]);
                    let threshold = if is_trade[i] || is_trade[j] {
                        config.trade_fuzzy_threshold
                    } else {
                        config.fuzzy_threshold
                    };
                    if jaccard(&tokens_i, &tokens_j) >= threshold {
                        merge(&mut self.uf, &mut self.confidence, i, j, Confidence::Low);
                    }
                }
            }
        }
    }

    /// Steps 6 and 7 rolled together: collect the partition. Contacts never
    /// merged are singleton groups; confidence defaults to low.
    fn into_groups(mut self) -> Vec<Group> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..self.contacts.len() {
            let root = self.uf.find(i);
            by_root.entry(root).or_default().push(i);
        }
        // BTreeMap iteration is ordered by root, and the smaller-root union
        // rule makes root order the load order of each group's first member.
        by_root
            .into_iter()
            .map(|(root, members)| Group {
                members,
                confidence: self.confidence[root],
            })
            .collect()
    }
}

/// Run the full cascade over contacts in load order and return the
/// partition, groups ordered by their first member.
#[must_use]
pub fn build_partition(
    contacts: &[Contact],
    config: &ResolverConfig,
    roles: &RoleMap,
) -> Vec<Group> {
    let mut cascade = Cascade::new(contacts);
    cascade.group_by_source_ref();
    cascade.group_by_license_field(|c| c.license_no.as_deref());
    cascade.group_by_license_field(|c| c.business_license_no.as_deref());
    cascade.group_by_exact_name_same_permit();
    cascade.fuzzy_match(config, roles);
    cascade.into_groups()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn contact(id: i64, feed: SourceFeed, permit_ref: &str, name: &str) -> Contact {
        Contact {
            id,
            source_feed: feed,
            permit_ref: permit_ref.into(),
            name: (!name.is_empty()).then(|| name.to_string()),
            firm: None,
            role: None,
            license_no: None,
            business_license_no: None,
            source_ref: None,
        }
    }

    fn members(groups: &[Group]) -> Vec<Vec<usize>> {
        groups.iter().map(|g| g.members.clone()).collect()
    }

    #[test]
    fn source_ref_groups_within_feed() {
        let mut a = contact(1, SourceFeed::Building, "P1", "ACME INC");
        let mut b = contact(2, SourceFeed::Building, "P2", "ACME INCORPORATED");
        let mut c = contact(3, SourceFeed::Electrical, "P3", "UNRELATED");
        a.source_ref = Some("ref-9".into());
        b.source_ref = Some("ref-9".into());
        // Same ref string on a different feed is a different namespace
        c.source_ref = Some("ref-9".into());

        let groups = build_partition(&[a, b, c], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1], vec![2]]);
        assert_eq!(groups[0].confidence, Confidence::High);
    }

    #[test]
    fn license_merges_across_feeds_and_formats() {
        let mut a = contact(1, SourceFeed::Building, "P1", "BAYSIDE ELECTRIC");
        let mut b = contact(2, SourceFeed::Electrical, "P2", "BAYSIDE ELEC CO");
        a.license_no = Some("c-10".into());
        b.license_no = Some("C10".into());

        let groups = build_partition(&[a, b], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1]]);
        assert_eq!(groups[0].confidence, Confidence::High);
    }

    #[test]
    fn exact_name_same_permit_requires_cross_feed() {
        // Same feed skips the exact-name step; the identical names still
        // meet at the fuzzy step, but only with low confidence.
        let same_feed = [
            contact(1, SourceFeed::Building, "P1", "JANE DOE"),
            contact(2, SourceFeed::Building, "P1", "Jane Doe"),
        ];
        let groups = build_partition(&same_feed, &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1]]);
        assert_eq!(groups[0].confidence, Confidence::Low);

        let cross_feed = [
            contact(1, SourceFeed::Building, "P1", "JANE DOE"),
            contact(2, SourceFeed::Plumbing, "P1", "Jane Doe"),
        ];
        let groups = build_partition(&cross_feed, &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1]]);
        assert_eq!(groups[0].confidence, Confidence::Medium);
    }

    #[rstest]
    // 3 shared of 4 tokens = 0.75, meets the default threshold
    #[case("ACME ELECTRIC INC", "ACME ELECTRIC INC LLC", None, true)]
    // 2 of 3 ≈ 0.667, below both thresholds
    #[case("ACME ELECTRIC", "ACME ELECTRIC CO", None, false)]
    // 7 of 10 = 0.70, below 0.75 but meets the 0.67 trade threshold;
    // the None-role twin below is the non-trade near-miss for the same pair
    #[case(
        "bay area quality construction development group inc llc",
        "bay area quality construction development group inc of marin",
        Some("General Contractor"),
        true
    )]
    #[case(
        "bay area quality construction development group inc llc",
        "bay area quality construction development group inc of marin",
        None,
        false
    )]
    fn fuzzy_thresholds(
        #[case] name_a: &str,
        #[case] name_b: &str,
        #[case] role: Option<&str>,
        #[case] should_merge: bool,
    ) {
        let mut a = contact(1, SourceFeed::Building, "P1", name_a);
        let b = contact(2, SourceFeed::Electrical, "P2", name_b);
        a.role = role.map(String::from);

        let groups = build_partition(&[a, b], &ResolverConfig::default(), &RoleMap::builtin());
        if should_merge {
            assert_eq!(members(&groups), vec![vec![0, 1]]);
            assert_eq!(groups[0].confidence, Confidence::Low);
        } else {
            assert_eq!(members(&groups), vec![vec![0], vec![1]]);
        }
    }

    #[test]
    fn fuzzy_merge_into_existing_group_keeps_best_confidence() {
        let mut a = contact(1, SourceFeed::Building, "P1", "ACME ELECTRIC INC LLC");
        let mut b = contact(2, SourceFeed::Electrical, "P2", "BAYSIDE POWER");
        let c = contact(3, SourceFeed::Plumbing, "P3", "ACME ELECTRIC INC");
        a.license_no = Some("C-10 99".into());
        b.license_no = Some("C1099".into());

        let groups = build_partition(&[a, b, c], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1, 2]]);
        // The fuzzy step joins c to a high-confidence license group; the
        // group keeps the best confidence seen, not the step's low
        assert_eq!(groups[0].confidence, Confidence::High);
    }

    #[test]
    fn fuzzy_blocking_prevents_cross_prefix_comparison() {
        // Identical token sets but different first tokens, so different
        // blocks; no comparison happens.
        let a = contact(1, SourceFeed::Building, "P1", "alpha beta gamma");
        let b = contact(2, SourceFeed::Electrical, "P2", "beta gamma alpha");
        let groups = build_partition(&[a, b], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0], vec![1]]);
    }

    #[test]
    fn null_heavy_contact_degrades_to_singleton() {
        let a = contact(1, SourceFeed::Building, "P1", "");
        let b = contact(2, SourceFeed::Building, "P1", "");
        let groups = build_partition(&[a, b], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0], vec![1]]);
        assert_eq!(groups[0].confidence, Confidence::Low);
    }

    #[test]
    fn license_union_bridges_source_ref_groups() {
        let mut a = contact(1, SourceFeed::Building, "P1", "ACME");
        let mut b = contact(2, SourceFeed::Building, "P2", "ACME INC");
        let mut c = contact(3, SourceFeed::Electrical, "P3", "ACME ELECTRIC");
        a.source_ref = Some("r1".into());
        b.source_ref = Some("r1".into());
        b.license_no = Some("0099".into());
        c.license_no = Some("99".into());

        let groups = build_partition(&[a, b, c], &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(members(&groups), vec![vec![0, 1, 2]]);
        assert_eq!(groups[0].confidence, Confidence::High);
    }

    #[test]
    fn partition_covers_every_contact_exactly_once() {
        let contacts: Vec<Contact> = (0..20)
            .map(|i| {
                contact(
                    i + 1,
                    SourceFeed::Building,
                    &format!("P{}", i % 5),
                    &format!("NAME {i}"),
                )
            })
            .collect();
        let groups = build_partition(&contacts, &ResolverConfig::default(), &RoleMap::builtin());

        let mut seen: Vec<usize> = groups.iter().flat_map(|g| g.members.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn partition_is_deterministic() {
        let mut a = contact(1, SourceFeed::Building, "P1", "ACME ELECTRIC INC");
        let b = contact(2, SourceFeed::Electrical, "P1", "acme electric inc llc");
        let mut c = contact(3, SourceFeed::Plumbing, "P2", "ACME ELECTRIC INC");
        a.license_no = Some("c-10".into());
        c.license_no = Some("C10".into());

        let contacts = vec![a, b, c];
        let first = build_partition(&contacts, &ResolverConfig::default(), &RoleMap::builtin());
        let second = build_partition(&contacts, &ResolverConfig::default(), &RoleMap::builtin());
        assert_eq!(first, second);
    }
}
