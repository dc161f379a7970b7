//! Vector store (RAG) adapter (spec §6)

use async_trait::async_trait;

use crate::types::{PipelineError, SimilarCase};

/// `SearchSimilarCases(query_text, disaster_type_hint, top_k)` (spec §6).
/// Must be cancellable; an empty result is valid and not an error — only
/// transport failure is.
#[async_trait]
pub trait VectorStoreAdapter: Send + Sync {
    async fn search_similar_cases(
        &self,
        query_text: &str,
        disaster_type_hint: &str,
        top_k: usize,
    ) -> Result<Vec<SimilarCase>, PipelineError>;
}

pub mod fakes {
    use super::*;

    /// Returns a fixed set of cases, truncated to `top_k`.
    pub struct StaticVectorStore {
        pub cases: Vec<SimilarCase>,
    }

    impl StaticVectorStore {
        pub fn new(cases: Vec<SimilarCase>) -> Self {
            Self { cases }
        }

        pub fn empty() -> Self {
            Self { cases: vec![] }
        }
    }

    #[async_trait]
    impl VectorStoreAdapter for StaticVectorStore {
        async fn search_similar_cases(
            &self,
            _query_text: &str,
            _disaster_type_hint: &str,
            top_k: usize,
        ) -> Result<Vec<SimilarCase>, PipelineError> {
            Ok(self.cases.iter().take(top_k).cloned().collect())
        }
    }

    /// Always fails at the transport layer — exercises the "RAG failure is
    /// non-fatal" path (spec §4.2).
    pub struct FailingVectorStore;

    #[async_trait]
    impl VectorStoreAdapter for FailingVectorStore {
        async fn search_similar_cases(
            &self,
            _query_text: &str,
            _disaster_type_hint: &str,
            _top_k: usize,
        ) -> Result<Vec<SimilarCase>, PipelineError> {
            Err(PipelineError::RagUnavailable("fixture transport failure".to_string()))
        }
    }
}
