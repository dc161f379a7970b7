//! Command-line demonstration of the triage-core decision pipeline.
//!
//! Reads a [`Request`] from a JSON file (or runs a built-in earthquake
//! scenario when none is given), wires the pipeline up to static fixture
//! adapters, and prints the resulting [`Output`] as pretty JSON.
//!
//! ```bash
//! demo --request scenario.json
//! demo --disaster-type earthquake
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use triage_core::adapters::knowledge_graph::fakes::StaticKnowledgeGraph;
use triage_core::adapters::knowledge_graph::{
    CapabilityMappingEntry, ConditionOp, RawRequiredCapability, RawRuleRecord, RawTriggeredTask, TriggerCondition,
    TriggerLogic,
};
use triage_core::adapters::llm::fakes::StaticLlmAdapter;
use triage_core::adapters::llm::LlmParsedDisaster;
use triage_core::adapters::team_registry::fakes::StaticTeamRegistry;
use triage_core::adapters::team_registry::Team;
use triage_core::adapters::vector_store::fakes::StaticVectorStore;
use triage_core::config::{self, PipelineConfig};
use triage_core::types::{Constraints, Location, Request, StructuredInput};
use triage_core::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "triage-core-demo")]
#[command(about = "Runs the emergency-response decision pipeline against a fixture backend")]
#[command(version)]
struct CliArgs {
    /// Path to a JSON-encoded `Request`. When omitted, a built-in
    /// earthquake scenario is used.
    #[arg(long, value_name = "PATH")]
    request: Option<String>,

    /// Path to a TOML pipeline config file. Falls back to `TRIAGE_CONFIG`
    /// and then built-in defaults, same as the library's own search order.
    #[arg(long, value_name = "PATH", env = "TRIAGE_CONFIG")]
    config: Option<String>,
}

fn builtin_request() -> Request {
    Request {
        event_id: "demo-event-1".to_string(),
        scenario_id: "demo-scenario-1".to_string(),
        disaster_description: "Magnitude 6.8 earthquake struck a mountainous county, multiple buildings \
            collapsed, residents reported trapped under rubble."
            .to_string(),
        structured_input: StructuredInput {
            location: Some(Location::new(31.68, 103.85)),
            disaster_type: Some("earthquake".to_string()),
            magnitude: Some(6.8),
            depth_km: Some(12.0),
            ..Default::default()
        },
        constraints: Constraints::default(),
        optimization_weights: None,
    }
}

fn load_request(path: Option<&str>) -> Result<Request> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading request file {p}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing request file {p}"))
        }
        None => Ok(builtin_request()),
    }
}

fn builtin_llm() -> StaticLlmAdapter {
    StaticLlmAdapter::new(LlmParsedDisaster {
        disaster_type: "earthquake".to_string(),
        severity: "critical".to_string(),
        magnitude: Some(6.8),
        depth_km: Some(12.0),
        affected_area_km2: Some(350.0),
        building_damage_level: Some("collapsed".to_string()),
        has_trapped_people: true,
        has_hazmat_release: false,
        has_infrastructure_collapse: true,
        has_fire: false,
        estimated_trapped: Some(180),
        affected_population: Some(42_000.0),
    })
}

fn builtin_rule() -> RawRuleRecord {
    RawRuleRecord {
        rule_id: "EQ-COLLAPSE-01".to_string(),
        rule_name: "Building collapse search and rescue".to_string(),
        disaster_type: "earthquake".to_string(),
        priority: "critical".to_string(),
        weight: 1.0,
        trigger_conditions: vec![TriggerCondition {
            field: "has_infrastructure_collapse".to_string(),
            op: ConditionOp::Eq,
            literal: serde_json::json!(true),
        }],
        trigger_logic: TriggerLogic::And,
        triggered_tasks: vec![
            RawTriggeredTask {
                task_code: "SEARCH_RESCUE".to_string(),
                task_name: "Search and rescue".to_string(),
                priority: "critical".to_string(),
                sequence: 1,
            },
            RawTriggeredTask {
                task_code: "MEDICAL_TRIAGE".to_string(),
                task_name: "Medical triage".to_string(),
                priority: "high".to_string(),
                sequence: 2,
            },
        ],
        required_capabilities: vec![
            RawRequiredCapability {
                capability_code: "LIFE_DETECTION".to_string(),
                capability_name: "Life detection".to_string(),
            },
            RawRequiredCapability {
                capability_code: "STRUCTURAL_RESCUE".to_string(),
                capability_name: "Structural rescue".to_string(),
            },
        ],
        scene_code: "building-collapse-search".to_string(),
    }
}

fn builtin_capability_mapping() -> Vec<CapabilityMappingEntry> {
    vec![
        CapabilityMappingEntry {
            capability_code: "LIFE_DETECTION".to_string(),
            capability_name: "Life detection".to_string(),
            resource_types: vec!["RESCUE_TEAM".to_string()],
        },
        CapabilityMappingEntry {
            capability_code: "STRUCTURAL_RESCUE".to_string(),
            capability_name: "Structural rescue".to_string(),
            resource_types: vec!["RESCUE_TEAM".to_string(), "ENGINEERING_TEAM".to_string()],
        },
    ]
}

fn builtin_teams() -> Vec<Team> {
    let base = Location::new(31.68, 103.85);
    (0..25)
        .map(|i| {
            let offset = f64::from(i) * 0.05;
            Team {
                id: format!("team-{i}"),
                name: format!("Rescue Team {i}"),
                team_type: "search_rescue".to_string(),
                base_location: Location::new(base.latitude + offset, base.longitude),
                base_address: format!("Station {i}"),
                total_personnel: 40,
                available_personnel: 36,
                capability_level: 3,
                response_time_minutes: None,
                status: "standby".to_string(),
                capabilities: vec!["LIFE_DETECTION".to_string(), "STRUCTURAL_RESCUE".to_string()],
                distance_km: 0.0,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Some(path) = &args.config {
        std::env::set_var("TRIAGE_CONFIG", path);
    }
    config::init(PipelineConfig::load());

    let request = load_request(args.request.as_deref())?;
    info!(event_id = %request.event_id, "loaded request");

    let llm = Arc::new(builtin_llm());
    let vector_store = Arc::new(StaticVectorStore::empty());
    let knowledge_graph = Arc::new(StaticKnowledgeGraph::new(vec![builtin_rule()], builtin_capability_mapping()));
    let team_registry = Arc::new(StaticTeamRegistry::new(builtin_teams()));

    let pipeline = Pipeline::new(llm, vector_store, knowledge_graph, team_registry)
        .context("failed to initialize pipeline")?;

    let output = pipeline.run(&request).await;

    println!("{}", serde_json::to_string_pretty(&output).context("serializing output")?);

    if !output.success {
        std::process::exit(1);
    }

    Ok(())
}
