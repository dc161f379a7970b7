//! triage-core: emergency-response decision pipeline
//!
//! Given a free-text disaster description plus structured context, runs a
//! fixed directed-graph pipeline — understanding, rule reasoning, HTN task
//! decomposition, resource matching, multi-objective allocation, and
//! hard/soft rule evaluation — to produce a ranked, explained allocation of
//! rescue resources.
//!
//! ## Architecture
//!
//! - **Understanding**: concurrent LLM parse + historical-case retrieval,
//!   with physics-based post-calibration.
//! - **Reasoning**: knowledge-graph rule matching and capability derivation.
//! - **HTN**: meta-task chain decomposition into a dependency-respecting
//!   sequence.
//! - **Matching**: geospatial, capability-aware team candidate search.
//! - **Allocation**: NSGA-II (with greedy fallback) over candidate subsets.
//! - **Evaluation**: hard-rule filtering, 5-D soft scoring, and explanation.

pub mod adapters;
pub mod allocation;
pub mod config;
pub mod evaluation;
pub mod htn;
pub mod matching;
pub mod pipeline;
pub mod reasoning;
pub mod types;
pub mod understanding;

pub use adapters::{KnowledgeGraphAdapter, LlmAdapter, TeamRegistryAdapter, VectorStoreAdapter};
pub use pipeline::Pipeline;
pub use types::{Output, PipelineError, Request};
