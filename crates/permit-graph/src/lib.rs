//! # permit-graph
//!
//! Relationship graph over resolved entities, plus the network anomaly
//! checks that run on top of it.
//!
//! The builder aggregates shared-permit co-occurrence into one undirected
//! edge per entity pair. Query contracts (direct neighbors, ego networks,
//! connected components) answer from the persisted edge table; the anomaly
//! checks work directly against the raw tables joined through the entity
//! partition.

pub mod anomaly;
pub mod builder;
pub mod error;
pub mod network;

pub use anomaly::{AnomalyReport, detect};
pub use builder::{GraphReport, build_edges};
pub use error::GraphError;
pub use network::{EgoNetwork, PermitNetwork, neighbors};
