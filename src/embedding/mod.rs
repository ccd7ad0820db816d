use anyhow::Result;
use image::RgbImage;

use crate::constants::CONCEPT_COUNT;
use crate::error::{EmbeddingKind, ScoreError};
use crate::scorer::{self, ScoreVector};

/// Image or concept embedding in the model's projection space
pub type Embedding = Vec<f32>;

/// The fixed, ordered set of concept embeddings and their threshold weights.
///
/// Validated once on construction and never mutated afterwards; share it
/// behind an `Arc` (or inside the provider that owns it).
#[derive(Debug, Clone)]
pub struct ConceptSet {
    embeddings: Vec<Embedding>,
    normalized: Vec<Vec<f64>>,
    weights: Vec<f64>,
    dim: usize,
}

impl ConceptSet {
    /// Build a concept set, checking count, shared dimensionality and norms.
    pub fn new(embeddings: Vec<Embedding>, weights: Vec<f64>) -> Result<Self, ScoreError> {
        if embeddings.len() != CONCEPT_COUNT {
            return Err(ScoreError::ConceptCount {
                expected: CONCEPT_COUNT,
                actual: embeddings.len(),
            });
        }
        if weights.len() != CONCEPT_COUNT {
            return Err(ScoreError::WeightCount {
                expected: CONCEPT_COUNT,
                actual: weights.len(),
            });
        }

        let dim = embeddings[0].len();
        let mut normalized = Vec::with_capacity(CONCEPT_COUNT);
        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dim {
                return Err(ScoreError::DimensionMismatch {
                    concept: i,
                    expected: dim,
                    actual: embedding.len(),
                });
            }
            normalized.push(scorer::l2_normalize(embedding, EmbeddingKind::Concept(i))?);
        }

        Ok(Self {
            embeddings,
            normalized,
            weights,
            dim,
        })
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Unit-length f64 copies of the embeddings, computed at construction
    pub fn normalized(&self) -> &[Vec<f64>] {
        &self.normalized
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Dimensionality shared by every concept embedding
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Score an image embedding against this set
    pub fn score(&self, image_embedding: &[f32]) -> Result<ScoreVector, ScoreError> {
        scorer::score_normalized(image_embedding, &self.normalized, &self.weights)
    }
}

/// Model capability the scoring pipeline depends on.
///
/// Implementations must be fully loaded before they are handed to the
/// pipeline; both methods are read-only and may be called concurrently.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed an already bounded RGB image
    fn embed_image(&self, image: &RgbImage) -> Result<Embedding>;

    /// Concept embeddings and weights, computed once at load time
    fn concept_set(&self) -> &ConceptSet;
}

mod clip;

pub use clip::{ClipSafetyModel, ModelSource};

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(i: usize, dim: usize) -> Embedding {
        let mut v = vec![0.0; dim];
        v[i % dim] = 1.0;
        v
    }

    #[test]
    fn concept_set_accepts_well_formed_input() {
        let set = ConceptSet::new(
            (0..CONCEPT_COUNT).map(|i| unit(i, 4)).collect(),
            vec![0.1; CONCEPT_COUNT],
        )
        .unwrap();

        assert_eq!(set.dim(), 4);
        assert_eq!(set.embeddings().len(), CONCEPT_COUNT);
        assert_eq!(set.weights().len(), CONCEPT_COUNT);

        let scores = set.score(&[0.0, 2.0, 0.0, 0.0]).unwrap();
        assert!((scores[1] - 0.9).abs() < 1e-12);
        assert!((scores[0] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn concepts_are_normalized_once_and_score_like_the_free_function() {
        let embeddings: Vec<Embedding> = (0..CONCEPT_COUNT)
            .map(|i| vec![3.0, 4.0 + i as f32, 0.5, -1.0])
            .collect();
        let weights: Vec<f64> = (0..CONCEPT_COUNT).map(|i| 0.03 * i as f64).collect();
        let set = ConceptSet::new(embeddings.clone(), weights.clone()).unwrap();

        for concept in set.normalized() {
            let norm: f64 = concept.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        assert_eq!(set.normalized()[0][0], 3.0 / (9.0f64 + 16.0 + 0.25 + 1.0).sqrt());

        let image = [0.2f32, -0.4, 1.5, 0.9];
        let cached = set.score(&image).unwrap();
        let fresh = scorer::score(&image, &embeddings, &weights).unwrap();
        assert_eq!(cached.map(f64::to_bits), fresh.map(f64::to_bits));
    }

    #[test]
    fn concept_set_rejects_ragged_dimensions() {
        let mut embeddings: Vec<Embedding> = (0..CONCEPT_COUNT).map(|i| unit(i, 4)).collect();
        embeddings[16] = vec![1.0; 5];

        let err = ConceptSet::new(embeddings, vec![0.0; CONCEPT_COUNT]).unwrap_err();
        assert_eq!(
            err,
            ScoreError::DimensionMismatch {
                concept: 16,
                expected: 4,
                actual: 5,
            }
        );
    }

    #[test]
    fn concept_set_rejects_wrong_counts_and_zero_vectors() {
        let embeddings: Vec<Embedding> = (0..3).map(|i| unit(i, 4)).collect();
        assert!(matches!(
            ConceptSet::new(embeddings, vec![0.0; 3]),
            Err(ScoreError::ConceptCount { actual: 3, .. })
        ));

        let mut embeddings: Vec<Embedding> = (0..CONCEPT_COUNT).map(|i| unit(i, 4)).collect();
        assert!(matches!(
            ConceptSet::new(embeddings.clone(), vec![0.0; 2]),
            Err(ScoreError::WeightCount { actual: 2, .. })
        ));

        embeddings[2] = vec![0.0; 4];
        assert_eq!(
            ConceptSet::new(embeddings, vec![0.0; CONCEPT_COUNT]).unwrap_err(),
            ScoreError::ZeroNorm(EmbeddingKind::Concept(2))
        );
    }

    #[test]
    fn image_with_wrong_dimension_fails_fast() {
        let set = ConceptSet::new(
            (0..CONCEPT_COUNT).map(|i| unit(i, 4)).collect(),
            vec![0.0; CONCEPT_COUNT],
        )
        .unwrap();

        assert!(matches!(
            set.score(&[1.0; 768]),
            Err(ScoreError::DimensionMismatch { expected: 768, actual: 4, .. })
        ));
    }
}
