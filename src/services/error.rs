//! Maps scoring-pipeline failures onto HTTP status codes.
//!
//! Client faults (payloads that are not a decodable image) are logged at warn
//! and answered 400. Anything else means the model or concept set is broken and
//! is logged at error and answered 500.

use axum::http::StatusCode;

const LOG_TAG: &str = "[check_safety]";

/// Extension trait for logging a failed pipeline stage and converting it to a StatusCode
pub trait LogErr<T> {
    /// The payload could not be turned into an image
    fn reject_payload(self, stage: &str) -> Result<T, StatusCode>;

    /// Embedding or scoring failed on a valid image
    fn log_500(self, stage: &str) -> Result<T, StatusCode>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn reject_payload(self, stage: &str) -> Result<T, StatusCode> {
        self.map_err(|e| {
            log::warn!("{} rejected payload at {}: {}", LOG_TAG, stage, e);
            StatusCode::BAD_REQUEST
        })
    }

    fn log_500(self, stage: &str) -> Result<T, StatusCode> {
        self.map_err(|e| {
            log::error!("{} {} failed: {}", LOG_TAG, stage, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}
