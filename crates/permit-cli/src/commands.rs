//! Stage and query command handlers.

use anyhow::Context;
use chrono::Utc;
use permit_config::PermitConfig;
use permit_core::enums::PipelineStage;
use permit_core::roles::RoleMap;
use permit_db::PermitDb;
use serde::Serialize;

use crate::cli::QueryCommands;

/// Run one pipeline stage and append a run log record either way.
///
/// A failed stage still gets a `failed` row so `query runs` shows the
/// gap, then the error propagates for a non-zero exit.
pub async fn run_stage(
    db: &PermitDb,
    config: &PermitConfig,
    stage: PipelineStage,
) -> anyhow::Result<()> {
    let started = Utc::now();
    let outcome = execute_stage(db, config, stage).await;
    let finished = Utc::now();

    match outcome {
        Ok(detail) => {
            db.record_run(stage, "ok", Some(&detail), started, finished)
                .await?;
            if db.is_synced() {
                db.sync().await?;
            }
            println!("{stage}: {detail}");
            Ok(())
        }
        Err(error) => {
            let detail = format!("{error:#}");
            if let Err(log_error) = db
                .record_run(stage, "failed", Some(&detail), started, finished)
                .await
            {
                tracing::warn!(%stage, %log_error, "could not record failed run");
            }
            Err(error).with_context(|| format!("{stage} stage failed"))
        }
    }
}

/// Run every stage in dependency order, stopping at the first failure.
pub async fn run_pipeline(db: &PermitDb, config: &PermitConfig) -> anyhow::Result<()> {
    for stage in [
        PipelineStage::Resolve,
        PipelineStage::Graph,
        PipelineStage::Anomalies,
        PipelineStage::Signals,
        PipelineStage::Health,
    ] {
        run_stage(db, config, stage).await?;
    }
    Ok(())
}

async fn execute_stage(
    db: &PermitDb,
    config: &PermitConfig,
    stage: PipelineStage,
) -> anyhow::Result<String> {
    match stage {
        PipelineStage::Resolve => {
            let report = permit_resolve::run(db, &config.resolver, &RoleMap::builtin()).await?;
            Ok(format!(
                "contacts={} entities={}",
                report.contacts, report.entities
            ))
        }
        PipelineStage::Graph => {
            let report = permit_graph::build_edges(db, &config.graph).await?;
            Ok(format!("edges={}", report.edges))
        }
        PipelineStage::Anomalies => {
            let report = permit_graph::detect(db, &config.anomaly, Utc::now()).await?;
            let mut detail = format!("findings={}", report.findings);
            if !report.failed_checks.is_empty() {
                detail.push_str(&format!(
                    " failed_checks={}",
                    report.failed_checks.join(",")
                ));
            }
            Ok(detail)
        }
        PipelineStage::Signals => {
            let report = permit_signals::run_bank(db, &config.signals, Utc::now()).await?;
            let mut detail = format!("signals={}", report.signals);
            if !report.failed_detectors.is_empty() {
                let names: Vec<&str> = report
                    .failed_detectors
                    .iter()
                    .map(|t| t.as_str())
                    .collect();
                detail.push_str(&format!(" failed_detectors={}", names.join(",")));
            }
            Ok(detail)
        }
        PipelineStage::Health => {
            let report = permit_signals::run_health(db, Utc::now()).await?;
            Ok(format!("properties={}", report.properties))
        }
    }
}

fn emit<T: Serialize>(value: &T, json: bool, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

/// Dispatch one read-only query against the derived tables.
pub async fn query(
    db: &PermitDb,
    config: &PermitConfig,
    command: &QueryCommands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        QueryCommands::Search { fragment, limit } => {
            let entities = db.search_entities(fragment, *limit).await?;
            emit(&entities, json, |entities| {
                for e in entities {
                    println!(
                        "{}  {}  {}  contacts={}  {}",
                        e.id, e.entity_kind, e.confidence, e.contact_count, e.canonical_name
                    );
                }
            })
        }
        QueryCommands::Entity { id } => {
            let entity = db
                .get_entity(id)
                .await
                .with_context(|| format!("entity '{id}' not found"))?;
            emit(&entity, json, |e| {
                println!("id:         {}", e.id);
                println!("name:       {}", e.canonical_name);
                println!("firm:       {}", e.canonical_firm.as_deref().unwrap_or("-"));
                println!("kind:       {}", e.entity_kind);
                let roles: Vec<&str> = e.roles.iter().map(|r| r.as_str()).collect();
                println!("roles:      {}", roles.join(", "));
                println!("confidence: {}", e.confidence);
                println!("contacts:   {}", e.contact_count);
            })
        }
        QueryCommands::Neighbors { id } => {
            let edges = permit_graph::neighbors(db, id).await?;
            emit(&edges, json, |edges| {
                for edge in edges {
                    let other = if edge.entity_a == *id {
                        &edge.entity_b
                    } else {
                        &edge.entity_a
                    };
                    println!(
                        "{other}  shared_permits={}  total_cost={:.0}",
                        edge.shared_permits, edge.total_cost
                    );
                }
            })
        }
        QueryCommands::Ego { id, hops } => {
            let hops = (*hops).min(config.graph.max_ego_hops);
            let network = permit_graph::PermitNetwork::from_db(db).await?;
            let ego = network.ego_network(id, hops);
            emit(&ego, json, |ego| {
                println!(
                    "{}: {} nodes, {} edges within {} hops",
                    ego.center,
                    ego.nodes.len(),
                    ego.edges.len(),
                    ego.hops
                );
                for edge in &ego.edges {
                    println!(
                        "  {} -- {}  shared_permits={}",
                        edge.entity_a, edge.entity_b, edge.shared_permits
                    );
                }
            })
        }
        QueryCommands::Components {
            min_size,
            min_weight,
        } => {
            let network = permit_graph::PermitNetwork::from_db(db).await?;
            let components = network.components(*min_size, *min_weight);
            emit(&components, json, |components| {
                for (i, component) in components.iter().enumerate() {
                    println!("component {}: {}", i + 1, component.join(", "));
                }
            })
        }
        QueryCommands::Anomalies { limit } => {
            let findings = db.list_anomaly_findings(*limit).await?;
            emit(&findings, json, |findings| {
                for f in findings {
                    println!("{}  {}  {}  {}", f.id, f.entity_id, f.kind, f.detail);
                }
            })
        }
        QueryCommands::Health { property_key } => {
            let health = db.get_property_health(property_key).await?;
            match health {
                Some(health) => emit(&health, json, |h| {
                    println!("{}  {}  {}", h.property_key, h.tier, h.reason);
                }),
                // No row means no signals fired for the property
                None => emit(&serde_json::json!(null), json, |_| {
                    println!("{property_key}  on_track");
                }),
            }
        }
        QueryCommands::Signals { property_key } => {
            let signals = db.signals_for_property(property_key).await?;
            emit(&signals, json, |signals| {
                for s in signals {
                    println!(
                        "{}  {}  {}  {}",
                        s.signal_type,
                        s.severity,
                        s.permit_ref.as_deref().unwrap_or("-"),
                        s.detail
                    );
                }
            })
        }
        QueryCommands::Runs { limit } => {
            let runs = db.run_history(*limit).await?;
            emit(&runs, json, |runs| {
                for run in runs {
                    println!(
                        "{}  {}  {}  {}  {}",
                        run.started_at.to_rfc3339(),
                        run.stage,
                        run.status,
                        run.id,
                        run.detail.as_deref().unwrap_or("-")
                    );
                }
            })
        }
    }
}
