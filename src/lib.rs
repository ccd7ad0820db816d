//! Concept-safety scoring for generated images.
//!
//! An image is bounded to a maximum side length, embedded by the
//! stable-diffusion safety checker's CLIP vision tower, and compared with 17
//! fixed concept embeddings. Each score is the cosine similarity minus that
//! concept's calibrated weight; deciding what counts as unsafe is left to the
//! caller (see [`policy`]).

pub mod checker;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod models;
pub mod policy;
pub mod preprocess;
pub mod routes;
pub mod scorer;
pub mod services;

pub use checker::SafetyChecker;
pub use embedding::{ClipSafetyModel, ConceptSet, Embedding, EmbeddingProvider, ModelSource};
pub use error::ScoreError;
pub use scorer::{ScoreVector, score};

/// Shared state of the HTTP service
pub struct AppState {
    pub checker: SafetyChecker,
}
