//! Error taxonomy (spec §7)

use thiserror::Error;

/// The per-request error taxonomy. Every kind named in `spec.md` §7 has a
/// variant here; the orchestrator captures these as `.to_string()` into
/// `Output.errors` rather than aborting the process (spec §7 "Propagation
/// policy").
#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("disaster understanding failed to parse disaster_type: {0}")]
    ParseError(String),

    #[error("knowledge graph query failed: {0}")]
    KgUnavailable(String),

    #[error("team registry query failed: {0}")]
    DbUnavailable(String),

    #[error("vector store search failed: {0}")]
    RagUnavailable(String),

    #[error("multi-objective optimization failed: {0}")]
    OptimizationFailed(String),

    #[error("no candidate teams found within the maximum search radius")]
    NoCandidates,

    #[error("allocation produced no solutions")]
    NoSolution,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Whether this error kind is fatal to the pipeline (aborts to output
    /// assembly) or merely degrades a stage's output (spec §7).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::ParseError(_) | PipelineError::NoCandidates | PipelineError::NoSolution
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_unavailable_is_not_fatal() {
        assert!(!PipelineError::RagUnavailable("timeout".into()).is_fatal());
    }

    #[test]
    fn parse_error_is_fatal() {
        assert!(PipelineError::ParseError("missing disaster_type".into()).is_fatal());
    }
}
