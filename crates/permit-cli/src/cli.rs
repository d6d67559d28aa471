//! Command-line surface for the `permitgraph` binary.

use clap::{Parser, Subcommand};

/// Top-level CLI parser.
#[derive(Debug, Parser)]
#[command(name = "permitgraph", version, about = "Permit records intelligence engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path override (defaults to the configured path)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve contacts into deduplicated entities
    Resolve,
    /// Rebuild the relationship graph from the entity partition
    Graph,
    /// Run the network anomaly checks
    Anomalies,
    /// Run the signal detector bank
    Signals,
    /// Recompute property health from the current signals
    Health,
    /// Run the full pipeline in dependency order
    Run,
    /// Read-only queries over the derived tables
    #[command(subcommand)]
    Query(QueryCommands),
}

impl Commands {
    /// Whether this command mutates derived tables and needs the single
    /// writer lock.
    #[must_use]
    pub const fn requires_write_lock(&self) -> bool {
        !matches!(self, Self::Query(_))
    }
}

#[derive(Debug, Subcommand)]
pub enum QueryCommands {
    /// Search entities by name fragment
    Search {
        fragment: String,
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one entity
    Entity { id: String },
    /// Direct edges for one entity, strongest first
    Neighbors { id: String },
    /// Induced subgraph within N hops of an entity
    Ego {
        id: String,
        #[arg(long, default_value_t = 2)]
        hops: u32,
    },
    /// Connected components of the relationship graph
    Components {
        #[arg(long, default_value_t = 2)]
        min_size: usize,
        #[arg(long, default_value_t = 1)]
        min_weight: u32,
    },
    /// Current anomaly findings
    Anomalies {
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
    /// Health tier for one property
    Health { property_key: String },
    /// Current signals for one property
    Signals { property_key: String },
    /// Recent pipeline runs, newest first
    Runs {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}
