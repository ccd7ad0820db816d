//! Scoring pipeline: bound the image, embed it, score it against the concepts.

use anyhow::Result;
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;

use crate::embedding::EmbeddingProvider;
use crate::preprocess;
use crate::scorer::ScoreVector;

/// Shared, read-only handle to a loaded provider.
///
/// Constructing one requires a fully loaded provider, so every `check` call
/// observes the finished concept set.
#[derive(Clone)]
pub struct SafetyChecker {
    provider: Arc<dyn EmbeddingProvider>,
    max_dimension: u32,
}

impl SafetyChecker {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_dimension: u32) -> Self {
        assert!(max_dimension > 0, "max_dimension must be positive");
        Self {
            provider,
            max_dimension,
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Score a decoded RGB image. Blocking; run off the async reactor.
    pub fn check(&self, image: RgbImage) -> Result<ScoreVector> {
        let started = Instant::now();
        let (width, height) = image.dimensions();

        let image = preprocess::resize(image, self.max_dimension);
        let embedding = self.provider.embed_image(&image)?;
        let scores = self.provider.concept_set().score(&embedding)?;

        log::debug!(
            "Scored {}x{} image (resized {}x{}) in {:.1}ms",
            width,
            height,
            image.width(),
            image.height(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(scores)
    }
}
