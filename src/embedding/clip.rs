use anyhow::{Context, Result, anyhow, bail};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder, linear_no_bias};
use candle_transformers::models::clip::text_model::Activation;
use candle_transformers::models::clip::vision_model::{ClipVisionConfig, ClipVisionTransformer};
use hf_hub::{Repo, RepoType, api::sync::Api};
use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

use super::{ConceptSet, Embedding, EmbeddingProvider};
use crate::constants::{CLIP_IMAGE_SIZE, CLIP_MEAN, CLIP_STD, CONCEPT_COUNT};

/// Where the safety checker's `config.json` and weights come from
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Hugging Face model repo, fetched (and cached) through hf-hub
    Hub { repo: String, weights: String },
    /// Local directory containing `config.json` and the weights file
    Local { dir: PathBuf, weights: String },
}

impl ModelSource {
    /// Resolve to local paths of (config, weights), downloading if needed
    fn resolve(&self) -> Result<(PathBuf, PathBuf)> {
        match self {
            ModelSource::Hub { repo, weights } => {
                let api = Api::new()?;
                let repo = api.repo(Repo::new(repo.clone(), RepoType::Model));
                let config = repo.get("config.json").context("fetching config.json")?;
                let weights = repo
                    .get(weights)
                    .with_context(|| format!("fetching {}", weights))?;
                Ok((config, weights))
            }
            ModelSource::Local { dir, weights } => {
                let config = dir.join("config.json");
                let weights = dir.join(weights);
                if !config.is_file() {
                    bail!("missing {}", config.display());
                }
                if !weights.is_file() {
                    bail!("missing {}", weights.display());
                }
                Ok((config, weights))
            }
        }
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Hub { repo, weights } => write!(f, "hf://{}/{}", repo, weights),
            ModelSource::Local { dir, weights } => write!(f, "{}", dir.join(weights).display()),
        }
    }
}

/// Subset of the checker's `config.json` we need. Fields absent from older
/// configs default to CLIP ViT-L/14.
#[derive(Debug, Deserialize)]
struct SafetyCheckerConfig {
    #[serde(default = "default_projection_dim")]
    projection_dim: usize,
    #[serde(default)]
    vision_config: VisionConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct VisionConfig {
    hidden_size: usize,
    intermediate_size: usize,
    num_hidden_layers: usize,
    num_attention_heads: usize,
    num_channels: usize,
    image_size: usize,
    patch_size: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            hidden_size: 1024,
            intermediate_size: 4096,
            num_hidden_layers: 24,
            num_attention_heads: 16,
            num_channels: 3,
            image_size: CLIP_IMAGE_SIZE as usize,
            patch_size: 14,
        }
    }
}

fn default_projection_dim() -> usize {
    768
}

impl SafetyCheckerConfig {
    fn vision(&self) -> ClipVisionConfig {
        let v = &self.vision_config;
        ClipVisionConfig {
            embed_dim: v.hidden_size,
            activation: Activation::QuickGelu,
            intermediate_size: v.intermediate_size,
            num_hidden_layers: v.num_hidden_layers,
            num_attention_heads: v.num_attention_heads,
            projection_dim: self.projection_dim,
            num_channels: v.num_channels,
            image_size: v.image_size,
            patch_size: v.patch_size,
        }
    }
}

/// Stable-diffusion safety checker: CLIP ViT-L/14 vision tower, visual
/// projection, and the 17 pretrained concept embeddings with their weights.
pub struct ClipSafetyModel {
    vision: ClipVisionTransformer,
    projection: Linear,
    concepts: ConceptSet,
    image_size: u32,
    device: Device,
}

impl ClipSafetyModel {
    pub fn load(source: &ModelSource) -> Result<Self> {
        let device = select_device();
        log::info!("Loading safety checker from {} on {:?}", source, device);
        let started = Instant::now();

        let (config_path, weights_path) = source.resolve()?;
        let config: SafetyCheckerConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)
                .with_context(|| format!("parsing {}", config_path.display()))?;
        let vision_config = config.vision();

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)?
        };

        // CLIPVisionModel wraps the transformer in another `vision_model`
        let vision =
            ClipVisionTransformer::new(vb.pp("vision_model").pp("vision_model"), &vision_config)
                .context("loading vision tower")?;
        let projection = linear_no_bias(
            vision_config.embed_dim,
            config.projection_dim,
            vb.pp("visual_projection"),
        )
        .context("loading visual projection")?;

        let embeddings = vb
            .get((CONCEPT_COUNT, config.projection_dim), "concept_embeds")?
            .to_vec2::<f32>()?;
        let weights = vb
            .get(CONCEPT_COUNT, "concept_embeds_weights")?
            .to_vec1::<f32>()?
            .into_iter()
            .map(f64::from)
            .collect();
        let concepts = ConceptSet::new(embeddings, weights)?;

        if concepts.dim() != config.projection_dim {
            bail!(
                "concept embeddings have {} dims but the projection outputs {}",
                concepts.dim(),
                config.projection_dim
            );
        }

        log::info!(
            "Safety checker loaded in {:.0}ms ({} concepts, {} dims)",
            started.elapsed().as_secs_f64() * 1000.0,
            CONCEPT_COUNT,
            concepts.dim()
        );

        Ok(Self {
            vision,
            projection,
            concepts,
            image_size: vision_config.image_size as u32,
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl EmbeddingProvider for ClipSafetyModel {
    fn embed_image(&self, image: &RgbImage) -> Result<Embedding> {
        let size = self.image_size as usize;
        let pixels = clip_pixel_values(image, self.image_size)?;
        let input = Tensor::from_vec(pixels, (1, 3, size, size), &self.device)?;

        let pooled = self.vision.forward(&input)?;
        let projected = self.projection.forward(&pooled)?;
        let embedding = projected.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?;

        if embedding.len() != self.concepts.dim() {
            return Err(anyhow!(
                "image embedding has {} dims, concept set has {}",
                embedding.len(),
                self.concepts.dim()
            ));
        }

        Ok(embedding)
    }

    fn concept_set(&self) -> &ConceptSet {
        &self.concepts
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    let device = Device::new_metal(0).unwrap_or(Device::Cpu);
    #[cfg(all(feature = "cuda", not(feature = "metal")))]
    let device = Device::new_cuda(0).unwrap_or(Device::Cpu);
    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    let device = Device::Cpu;

    device
}

/// CLIP input tensor data: shortest edge resized to `size` (bicubic), center
/// cropped to `size`x`size`, normalized with CLIP mean/std, CHW layout.
fn clip_pixel_values(image: &RgbImage, size: u32) -> Result<Vec<f32>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        bail!("image has zero dimensions");
    }

    let (resized_w, resized_h) = if width <= height {
        (size, scale_side(height, size, width))
    } else {
        (scale_side(width, size, height), size)
    };
    let resized = imageops::resize(image, resized_w, resized_h, FilterType::CatmullRom);

    let left = (resized_w - size) / 2;
    let top = (resized_h - size) / 2;
    let cropped = imageops::crop_imm(&resized, left, top, size, size).to_image();

    let plane = (size * size) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, pixel) in cropped.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            data[c * plane + i] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }

    Ok(data)
}

/// `side * target / reference`, truncated like the CLIP feature extractor,
/// never below `target`
fn scale_side(side: u32, target: u32, reference: u32) -> u32 {
    let scaled = side as u64 * target as u64 / reference as u64;
    (scaled as u32).max(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn pixel_values_have_chw_shape() {
        let image = RgbImage::new(640, 427);
        let data = clip_pixel_values(&image, 224).unwrap();
        assert_eq!(data.len(), 3 * 224 * 224);
    }

    #[test]
    fn uniform_image_normalizes_per_channel() {
        let image = RgbImage::from_pixel(300, 100, Rgb([255, 0, 128]));
        let data = clip_pixel_values(&image, 224).unwrap();
        let plane = 224 * 224;

        let expected = [
            (1.0 - CLIP_MEAN[0]) / CLIP_STD[0],
            (0.0 - CLIP_MEAN[1]) / CLIP_STD[1],
            (128.0 / 255.0 - CLIP_MEAN[2]) / CLIP_STD[2],
        ];
        for c in 0..3 {
            for value in [data[c * plane], data[c * plane + plane / 2], data[(c + 1) * plane - 1]] {
                assert!((value - expected[c]).abs() < 1e-4, "channel {}: {}", c, value);
            }
        }
    }

    #[test]
    fn shortest_edge_scaling() {
        assert_eq!(scale_side(427, 224, 640), 224);
        // 640 * 224 / 427 = 335.7, truncated
        assert_eq!(scale_side(640, 224, 427), 335);
        assert_eq!(scale_side(1200, 224, 800), 336);
        assert_eq!(scale_side(447, 224, 224), 447);
        assert_eq!(scale_side(224, 224, 224), 224);
    }

    #[test]
    fn config_defaults_to_vit_large() {
        let config: SafetyCheckerConfig = serde_json::from_str("{}").unwrap();
        let vision = config.vision();
        assert_eq!(vision.embed_dim, 1024);
        assert_eq!(vision.num_hidden_layers, 24);
        assert_eq!(vision.patch_size, 14);
        assert_eq!(config.projection_dim, 768);
    }

    #[test]
    fn config_reads_overrides() {
        let json = r#"{
            "projection_dim": 512,
            "vision_config": { "hidden_size": 768, "num_hidden_layers": 12, "hidden_act": "quick_gelu" }
        }"#;
        let config: SafetyCheckerConfig = serde_json::from_str(json).unwrap();
        let vision = config.vision();
        assert_eq!(vision.embed_dim, 768);
        assert_eq!(vision.num_hidden_layers, 12);
        assert_eq!(vision.num_attention_heads, 16);
        assert_eq!(vision.projection_dim, 512);
    }

    #[test]
    fn missing_local_model_is_an_error() {
        let source = ModelSource::Local {
            dir: std::env::temp_dir().join("safety-checker-missing-model"),
            weights: "model.safetensors".to_string(),
        };
        assert!(source.resolve().is_err());
        assert!(source.to_string().ends_with("model.safetensors"));
    }
}
