//! External collaborator interfaces (spec §6 "External Interfaces").
//!
//! Every adapter below is an `#[async_trait] pub trait` carrying only the
//! contract named in `spec.md` — no transport detail, since the HTTP/SQL/
//! vector-store wiring is explicitly out of scope (spec §1). Each trait
//! also ships an in-memory fake implementation (`fakes` submodule) used by
//! the pipeline's own integration tests, a `NoOpStore`/`StaticKnowledgeBase`
//! split in the style of `context::KnowledgeStore`.

pub mod knowledge_graph;
pub mod llm;
pub mod team_registry;
pub mod vector_store;

pub use knowledge_graph::{CapabilityMappingEntry, KnowledgeGraphAdapter, RawRuleRecord};
pub use llm::LlmAdapter;
pub use team_registry::{Team, TeamRegistryAdapter};
pub use vector_store::VectorStoreAdapter;
