//! Shared data structures for the emergency-response decision pipeline
//!
//! - `request`: inbound `Request` plus its optional overrides
//! - `disaster`: `ParsedDisaster`, `SimilarCase` (Disaster Understanding stage)
//! - `rules`: `MatchedRule`, `CapabilityRequirement` (Rule Reasoning stage)
//! - `htn`: `TaskSequenceItem`, `ParallelGroup` (HTN Decomposer stage)
//! - `resources`: `ResourceCandidate` (Resource Matcher stage)
//! - `allocation`: `AllocationSolution` (Allocator stage)
//! - `evaluation`: `SchemeScore`, weight records (Rule Evaluator stage)
//! - `trace`: append-only `Trace` threaded through every stage
//! - `output`: the final `Output` record assembled at the end of a run
//! - `error`: the `PipelineError` taxonomy (see spec §7)

mod allocation;
mod disaster;
mod error;
mod evaluation;
mod htn;
mod output;
mod request;
mod resources;
mod rules;
mod trace;

pub use allocation::*;
pub use disaster::*;
pub use error::*;
pub use evaluation::*;
pub use htn::*;
pub use output::*;
pub use request::*;
pub use resources::*;
pub use rules::*;
pub use trace::*;
