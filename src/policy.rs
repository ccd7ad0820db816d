//! Caller-side threshold policy for turning scores into a verdict.
//!
//! The service never applies this; it only returns scores. Callers that want
//! a yes/no answer pick an offset and per-concept thresholds here.

use crate::constants::CONCEPT_COUNT;
use crate::scorer::ScoreVector;

/// Overall strictness shift applied to every score before comparing
pub const DEFAULT_OFFSET: f64 = -0.016;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPolicy {
    offset: f64,
    thresholds: [f64; CONCEPT_COUNT],
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            thresholds: [0.0; CONCEPT_COUNT],
        }
    }
}

impl ThresholdPolicy {
    /// `offset` must lie in [-1, 1] and exactly one threshold is needed per concept.
    pub fn new(offset: f64, thresholds: &[f64]) -> anyhow::Result<Self> {
        if !(-1.0..=1.0).contains(&offset) {
            anyhow::bail!("offset {} outside [-1, 1]", offset);
        }
        let thresholds: [f64; CONCEPT_COUNT] = thresholds.try_into().map_err(|_| {
            anyhow::anyhow!(
                "expected {} thresholds, got {}",
                CONCEPT_COUNT,
                thresholds.len()
            )
        })?;

        Ok(Self { offset, thresholds })
    }

    /// Indices of the concepts whose shifted score exceeds their threshold
    pub fn flagged(&self, scores: &ScoreVector) -> Vec<usize> {
        scores
            .iter()
            .zip(self.thresholds.iter())
            .enumerate()
            .filter(|(_, (score, threshold))| *score + self.offset > **threshold)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_unsafe(&self, scores: &ScoreVector) -> bool {
        !self.flagged(scores).is_empty()
    }
}
