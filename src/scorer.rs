//! Concept scoring: cosine similarity against the concept set, recentered by
//! each concept's calibrated weight.

use crate::constants::CONCEPT_COUNT;
use crate::error::{EmbeddingKind, ScoreError};

/// One score per concept, in concept-set order. Higher means the concept is
/// more likely present; no cutoff is applied here.
pub type ScoreVector = [f64; CONCEPT_COUNT];

/// L2-normalize an embedding into f64.
pub fn l2_normalize(embedding: &[f32], kind: EmbeddingKind) -> Result<Vec<f64>, ScoreError> {
    if embedding.is_empty() {
        return Err(ScoreError::Empty);
    }

    let norm = embedding
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();

    if norm == 0.0 || !norm.is_finite() {
        return Err(ScoreError::ZeroNorm(kind));
    }

    Ok(embedding.iter().map(|&x| f64::from(x) / norm).collect())
}

/// Dot product of two already-normalized vectors of equal length.
#[inline]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Score an image embedding against the concept embeddings.
///
/// `score[i] = cos(image, concept[i]) - weights[i]`
///
/// # Errors
/// Any [`ScoreError`]: wrong concept or weight count, a concept whose
/// dimensionality differs from the image embedding, or a zero-norm vector.
pub fn score(
    image_embedding: &[f32],
    concept_embeddings: &[Vec<f32>],
    concept_weights: &[f64],
) -> Result<ScoreVector, ScoreError> {
    if concept_embeddings.len() != CONCEPT_COUNT {
        return Err(ScoreError::ConceptCount {
            expected: CONCEPT_COUNT,
            actual: concept_embeddings.len(),
        });
    }
    if concept_weights.len() != CONCEPT_COUNT {
        return Err(ScoreError::WeightCount {
            expected: CONCEPT_COUNT,
            actual: concept_weights.len(),
        });
    }

    let normalized = concept_embeddings
        .iter()
        .enumerate()
        .map(|(i, concept)| l2_normalize(concept, EmbeddingKind::Concept(i)))
        .collect::<Result<Vec<_>, _>>()?;

    score_normalized(image_embedding, &normalized, concept_weights)
}

/// Score against concept embeddings that are already L2-normalized.
///
/// Counts are the caller's responsibility; [`crate::embedding::ConceptSet`]
/// validates them once at construction.
pub fn score_normalized(
    image_embedding: &[f32],
    normalized_concepts: &[Vec<f64>],
    concept_weights: &[f64],
) -> Result<ScoreVector, ScoreError> {
    let image = l2_normalize(image_embedding, EmbeddingKind::Image)?;

    let mut scores = [0.0; CONCEPT_COUNT];
    for (i, (concept, weight)) in normalized_concepts.iter().zip(concept_weights).enumerate() {
        if concept.len() != image.len() {
            return Err(ScoreError::DimensionMismatch {
                concept: i,
                expected: image.len(),
                actual: concept.len(),
            });
        }
        scores[i] = cosine_similarity(&image, concept) - weight;
    }

    Ok(scores)
}
