use thiserror::Error;

/// Contract violations detected while building a concept set or scoring.
///
/// None of these are transient: the same inputs fail the same way every time,
/// so callers should treat them as fatal configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("dimension mismatch: concept {concept} has {actual} dims, expected {expected}")]
    DimensionMismatch {
        concept: usize,
        expected: usize,
        actual: usize,
    },

    #[error("expected {expected} concept embeddings, got {actual}")]
    ConceptCount { expected: usize, actual: usize },

    #[error("expected {expected} concept weights, got {actual}")]
    WeightCount { expected: usize, actual: usize },

    #[error("{0} embedding has zero or non-finite norm")]
    ZeroNorm(EmbeddingKind),

    #[error("empty embedding")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Image,
    Concept(usize),
}

impl std::fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingKind::Image => write!(f, "image"),
            EmbeddingKind::Concept(i) => write!(f, "concept {}", i),
        }
    }
}
