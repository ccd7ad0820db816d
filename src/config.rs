//! Environment configuration
//!
//! - `HOST` / `PORT` - listen address (default `0.0.0.0:4210`)
//! - `MAX_IMAGE_DIMENSION` - longest image side before embedding (default `640`)
//! - `MAX_REQUEST_BYTES` - request body limit (default 32 MB)
//! - `SAFETY_MODEL_REPO` - Hugging Face repo (default `CompVis/stable-diffusion-safety-checker`)
//! - `SAFETY_MODEL_DIR` - local model directory, used instead of the hub when set
//! - `SAFETY_MODEL_WEIGHTS` - weights file name (default `model.safetensors`)
//!
//! Unparseable or out-of-range values fall back to the defaults.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_MODEL_REPO,
    DEFAULT_PORT, DEFAULT_WEIGHTS_FILE,
};
use crate::embedding::ModelSource;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_image_dimension: u32,
    pub max_request_bytes: usize,
    pub model: ModelSource,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let weights = lookup("SAFETY_MODEL_WEIGHTS")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WEIGHTS_FILE.to_string());

        let model = match lookup("SAFETY_MODEL_DIR").filter(|v| !v.trim().is_empty()) {
            Some(dir) => ModelSource::Local {
                dir: PathBuf::from(dir),
                weights,
            },
            None => ModelSource::Hub {
                repo: lookup("SAFETY_MODEL_REPO")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_MODEL_REPO.to_string()),
                weights,
            },
        };

        Self {
            host: lookup("HOST")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: lookup("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_image_dimension: lookup("MAX_IMAGE_DIMENSION")
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_IMAGE_DIMENSION),
            max_request_bytes: lookup("MAX_REQUEST_BYTES")
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
            model,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.addr(), "0.0.0.0:4210");
        assert_eq!(config.max_image_dimension, 640);
        assert_eq!(config.max_request_bytes, 32 * 1024 * 1024);
        match config.model {
            ModelSource::Hub { repo, weights } => {
                assert_eq!(repo, "CompVis/stable-diffusion-safety-checker");
                assert_eq!(weights, "model.safetensors");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("MAX_IMAGE_DIMENSION", "1024"),
            ("SAFETY_MODEL_DIR", "/models/checker"),
            ("SAFETY_MODEL_WEIGHTS", "weights.safetensors"),
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.max_image_dimension, 1024);
        match config.model {
            ModelSource::Local { dir, weights } => {
                assert_eq!(dir, PathBuf::from("/models/checker"));
                assert_eq!(weights, "weights.safetensors");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config(&[
            ("PORT", "not-a-port"),
            ("MAX_IMAGE_DIMENSION", "0"),
            ("MAX_REQUEST_BYTES", "-5"),
        ]);
        assert_eq!(config.port, 4210);
        assert_eq!(config.max_image_dimension, 640);
        assert_eq!(config.max_request_bytes, 32 * 1024 * 1024);
    }
}
