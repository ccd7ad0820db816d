//! Service constants

/// Number of concepts in the safety checker's concept set
pub const CONCEPT_COUNT: usize = 17;

/// Default bound on the longer image side before embedding
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 640;

/// Default listen host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 4210;

/// Maximum request body size (32 MB of base64)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Hugging Face repo holding the safety checker weights
pub const DEFAULT_MODEL_REPO: &str = "CompVis/stable-diffusion-safety-checker";

/// Weights file within the model repo or directory
pub const DEFAULT_WEIGHTS_FILE: &str = "model.safetensors";

/// CLIP input resolution
pub const CLIP_IMAGE_SIZE: u32 = 224;

/// CLIP per-channel normalization
pub const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
pub const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];
