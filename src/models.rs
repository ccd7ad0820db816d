//! Request and response bodies of the HTTP service

use serde::{Deserialize, Serialize};

/// `POST /check_safety` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsfwCheck {
    /// Base64 encoded image data, optionally prefixed with `base64://` or a
    /// `data:<mime>;base64,` header
    pub image: String,
}

/// `POST /check_safety` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    /// One score per concept; higher means the concept is more likely present
    pub concept_scores: Vec<f64>,
}
