//! # permit-core
//!
//! Core types for the permitgraph intelligence engine.
//!
//! This crate provides the foundational types shared across all permitgraph
//! crates:
//! - Record structs for raw rows (contacts, permits) and derived rows
//!   (entities, relationships, signals, property health, anomaly findings)
//! - Tagged enums for everything the source feeds express as free text
//!   (roles, feeds, risk tiers, signal catalog)
//! - The raw-role → [`enums::EntityKind`] mapping table
//! - ID prefix constants

pub mod enums;
pub mod ids;
pub mod records;
pub mod roles;
