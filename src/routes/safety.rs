use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use std::sync::Arc;

use crate::AppState;
use crate::models::{NsfwCheck, ReviewResult};
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/check_safety", post(check_safety))
}

/// POST /check_safety - Score a base64 image against every concept
async fn check_safety(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NsfwCheck>,
) -> Result<Json<ReviewResult>, StatusCode> {
    let checker = state.checker.clone();

    // Decoding and inference are CPU bound
    let scores = tokio::task::spawn_blocking(move || {
        let image = decode_image(&request.image).reject_payload("decode")?;
        checker.check(image).log_500("scoring")
    })
    .await
    .log_500("scoring task")??;

    Ok(Json(ReviewResult {
        concept_scores: scores.to_vec(),
    }))
}

/// Decode a base64 payload into an RGB image
pub fn decode_image(payload: &str) -> Result<RgbImage> {
    let bytes = decode_base64(payload)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| anyhow!("undecodable image: {}", e))?;
    Ok(image.to_rgb8())
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    // MIME and `base64` CLI output wrap lines at 76 columns
    let data: String = strip_prefix(payload.trim())
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if data.is_empty() {
        return Err(anyhow!("empty image payload"));
    }

    STANDARD
        .decode(data.as_bytes())
        .map_err(|e| anyhow!("invalid base64: {}", e))
}

/// Drop a `base64://` or `data:<mime>;base64,` prefix
fn strip_prefix(payload: &str) -> &str {
    if let Some(rest) = payload.strip_prefix("base64://") {
        return rest;
    }
    if payload.starts_with("data:") {
        if let Some((_, rest)) = payload.split_once(";base64,") {
            return rest;
        }
    }
    payload
}
