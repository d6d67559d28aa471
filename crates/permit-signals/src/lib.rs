//! # permit-signals
//!
//! Risk signal detection and property health aggregation.
//!
//! The detector bank evaluates a fixed catalog of risk conditions against
//! the raw permit, inspection, violation, and complaint tables. It runs
//! independently of entity resolution. The health aggregator then folds
//! each property's signals into a single ordered tier, escalating when
//! multiple independent compounding risk types co-occur.

pub mod bank;
mod detectors;
pub mod error;
pub mod health;

pub use bank::{SignalReport, run as run_bank};
pub use error::SignalError;
pub use health::{HealthReport, aggregate, run as run_health};
