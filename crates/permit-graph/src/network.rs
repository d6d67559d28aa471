//! In-memory network queries: ego networks and connected components.
//!
//! Built on `rustworkx-core`'s petgraph re-export. The edge table is small
//! relative to the raw tables, so queries load it wholesale and answer from
//! memory.

use std::collections::{HashMap, HashSet, VecDeque};

use rustworkx_core::connectivity::connected_components;
use rustworkx_core::petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use permit_core::records::Relationship;
use permit_db::PermitDb;

use crate::error::GraphError;

/// Induced subgraph around one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgoNetwork {
    pub center: String,
    pub hops: u32,
    /// All entities within `hops` of the center, sorted, center included.
    pub nodes: Vec<String>,
    /// Every edge with both endpoints in `nodes`.
    pub edges: Vec<Relationship>,
}

/// Undirected co-occurrence graph loaded from the relationships table.
pub struct PermitNetwork {
    graph: UnGraph<String, u32>,
    id_to_index: HashMap<String, NodeIndex>,
    edges: Vec<Relationship>,
}

impl PermitNetwork {
    /// Load the full edge set and build the in-memory graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if reading the edge table fails.
    pub async fn from_db(db: &PermitDb) -> Result<Self, GraphError> {
        let edges = db.list_relationships().await?;
        Ok(Self::from_edges(edges))
    }

    #[must_use]
    pub fn from_edges(edges: Vec<Relationship>) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();

        for edge in &edges {
            let a = *id_to_index
                .entry(edge.entity_a.clone())
                .or_insert_with(|| graph.add_node(edge.entity_a.clone()));
            let b = *id_to_index
                .entry(edge.entity_b.clone())
                .or_insert_with(|| graph.add_node(edge.entity_b.clone()));
            graph.add_edge(a, b, edge.shared_permits);
        }

        Self {
            graph,
            id_to_index,
            edges,
        }
    }

    /// BFS expansion to `hops` around `entity_id`, returning the induced
    /// subgraph. An entity with no edges yields a single-node network.
    #[must_use]
    pub fn ego_network(&self, entity_id: &str, hops: u32) -> EgoNetwork {
        let mut reached: HashSet<&str> = HashSet::new();
        reached.insert(entity_id);

        if let Some(&start) = self.id_to_index.get(entity_id) {
            let mut queue: VecDeque<(NodeIndex, u32)> = VecDeque::new();
            queue.push_back((start, 0));
            let mut visited: HashSet<NodeIndex> = HashSet::new();
            visited.insert(start);

            while let Some((node, depth)) = queue.pop_front() {
                if depth == hops {
                    continue;
                }
                for neighbor in self.graph.neighbors(node) {
                    if visited.insert(neighbor) {
                        reached.insert(self.graph[neighbor].as_str());
                        queue.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        let mut nodes: Vec<String> = reached.iter().map(ToString::to_string).collect();
        nodes.sort_unstable();

        let edges = self
            .edges
            .iter()
            .filter(|e| {
                reached.contains(e.entity_a.as_str()) && reached.contains(e.entity_b.as_str())
            })
            .cloned()
            .collect();

        EgoNetwork {
            center: entity_id.to_string(),
            hops,
            nodes,
            edges,
        }
    }

    /// Connected components over the subgraph of edges with at least
    /// `min_weight` shared permits. Components smaller than `min_size` are
    /// dropped; members and components come back sorted.
    #[must_use]
    pub fn components(&self, min_size: usize, min_weight: u32) -> Vec<Vec<String>> {
        let mut filtered: UnGraph<&str, u32> = UnGraph::new_undirected();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for edge in &self.edges {
            if edge.shared_permits < min_weight {
                continue;
            }
            let a = *index
                .entry(edge.entity_a.as_str())
                .or_insert_with(|| filtered.add_node(edge.entity_a.as_str()));
            let b = *index
                .entry(edge.entity_b.as_str())
                .or_insert_with(|| filtered.add_node(edge.entity_b.as_str()));
            filtered.add_edge(a, b, edge.shared_permits);
        }

        let mut components: Vec<Vec<String>> = connected_components(&filtered)
            .into_iter()
            .filter(|component| component.len() >= min_size)
            .map(|component| {
                let mut members: Vec<String> = component
                    .into_iter()
                    .map(|idx| filtered[idx].to_string())
                    .collect();
                members.sort_unstable();
                members
            })
            .collect();
        components.sort();
        components
    }
}

/// Direct edges touching one entity, strongest first.
///
/// # Errors
///
/// Returns [`GraphError::UnknownEntity`] if the entity does not exist, or a
/// database error if the read fails.
pub async fn neighbors(db: &PermitDb, entity_id: &str) -> Result<Vec<Relationship>, GraphError> {
    match db.get_entity(entity_id).await {
        Ok(_) => Ok(db.relationships_for_entity(entity_id).await?),
        Err(permit_db::error::DatabaseError::NoResult) => {
            Err(GraphError::UnknownEntity(entity_id.to_string()))
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edge(a: &str, b: &str, shared: u32) -> Relationship {
        Relationship {
            entity_a: a.into(),
            entity_b: b.into(),
            shared_permits: shared,
            permit_refs: vec![],
            permit_types: vec![],
            first_seen: None,
            last_seen: None,
            total_cost: 0.0,
            neighborhoods: vec![],
        }
    }

    fn chain() -> PermitNetwork {
        // e1 - e2 - e3 - e4, plus isolated pair e5 - e6
        PermitNetwork::from_edges(vec![
            edge("ent-000001", "ent-000002", 3),
            edge("ent-000002", "ent-000003", 1),
            edge("ent-000003", "ent-000004", 2),
            edge("ent-000005", "ent-000006", 1),
        ])
    }

    #[test]
    fn ego_network_expands_by_hops() {
        let network = chain();

        let one_hop = network.ego_network("ent-000002", 1);
        assert_eq!(one_hop.nodes, vec!["ent-000001", "ent-000002", "ent-000003"]);
        assert_eq!(one_hop.edges.len(), 2);

        let two_hops = network.ego_network("ent-000002", 2);
        assert_eq!(
            two_hops.nodes,
            vec!["ent-000001", "ent-000002", "ent-000003", "ent-000004"]
        );
        assert_eq!(two_hops.edges.len(), 3);
    }

    #[test]
    fn ego_network_of_isolated_entity_is_single_node() {
        let network = chain();
        let ego = network.ego_network("ent-000099", 3);
        assert_eq!(ego.nodes, vec!["ent-000099"]);
        assert!(ego.edges.is_empty());
    }

    #[test]
    fn components_respect_min_size_and_weight() {
        let network = chain();

        let all = network.components(2, 1);
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[0],
            vec!["ent-000001", "ent-000002", "ent-000003", "ent-000004"]
        );
        assert_eq!(all[1], vec!["ent-000005", "ent-000006"]);

        // Weight 2 cuts the e2-e3 bridge and drops the weak pair entirely
        let strong = network.components(2, 2);
        assert_eq!(strong.len(), 2);
        assert_eq!(strong[0], vec!["ent-000001", "ent-000002"]);
        assert_eq!(strong[1], vec!["ent-000003", "ent-000004"]);

        let large_only = network.components(3, 1);
        assert_eq!(large_only.len(), 1);
        assert_eq!(large_only[0].len(), 4);
    }
}
