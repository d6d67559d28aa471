//! Table repositories, one module per table group.
//!
//! Raw-table repos expose the write surface used by the ingestion jobs (and
//! test fixtures) plus ordered reads for the pipeline. Derived-table repos
//! follow the truncate-and-recompute discipline: every `replace_*` method
//! swaps the previous run's rows inside a single transaction.

pub mod anomalies;
pub mod entities;
pub mod health;
pub mod raw;
pub mod relationships;
pub mod runs;
pub mod signals;
