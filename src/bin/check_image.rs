//! Score local image files with the safety checker, without the HTTP service.
//!
//! Reads the same environment configuration as the server (model source,
//! max image dimension). Verdicts are only printed with `--policy`.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use safety_checker::config::ServiceConfig;
use safety_checker::constants::CONCEPT_COUNT;
use safety_checker::policy::{DEFAULT_OFFSET, ThresholdPolicy};
use safety_checker::{ClipSafetyModel, SafetyChecker, logging};

#[derive(Debug, Parser)]
#[command(name = "check_image", about = "Score images against the safety concepts")]
struct Cli {
    /// Image files to score
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Print one JSON object per image instead of text
    #[arg(long)]
    json: bool,

    /// Apply a threshold policy and print a verdict
    #[arg(long)]
    policy: bool,

    /// Offset added to every score before comparing with its threshold
    #[arg(long, default_value_t = DEFAULT_OFFSET, allow_hyphen_values = true)]
    offset: f64,

    /// Per-concept thresholds, 17 comma separated values (default all 0)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    threshold: Vec<f64>,

    /// Override MAX_IMAGE_DIMENSION
    #[arg(long)]
    max_dimension: Option<u32>,
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a str,
    concept_scores: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flagged: Option<Vec<usize>>,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = ServiceConfig::from_env();

    let policy = if cli.policy {
        let policy = if cli.threshold.is_empty() {
            ThresholdPolicy::new(cli.offset, &[0.0; CONCEPT_COUNT])?
        } else {
            ThresholdPolicy::new(cli.offset, &cli.threshold)?
        };
        Some(policy)
    } else {
        None
    };

    let max_dimension = cli
        .max_dimension
        .filter(|v| *v > 0)
        .unwrap_or(config.max_image_dimension);

    let model = ClipSafetyModel::load(&config.model)?;
    let checker = SafetyChecker::new(Arc::new(model), max_dimension);

    for path in &cli.images {
        let image = image::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .to_rgb8();
        let scores = checker
            .check(image)
            .with_context(|| format!("scoring {}", path.display()))?;
        let flagged = policy.as_ref().map(|p| p.flagged(&scores));
        let display = path.display().to_string();

        if cli.json {
            let report = Report {
                path: &display,
                concept_scores: scores.to_vec(),
                flagged,
            };
            println!("{}", serde_json::to_string(&report)?);
            continue;
        }

        println!("{}", display);
        for (i, score) in scores.iter().enumerate() {
            println!("  concept {:>2}: {:+.6}", i, score);
        }
        if let Some(flagged) = flagged {
            if flagged.is_empty() {
                println!("  verdict: safe");
            } else {
                println!("  verdict: UNSAFE (concepts {:?})", flagged);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_flags() {
        let cli = Cli::parse_from([
            "check_image",
            "--policy",
            "--offset",
            "-0.05",
            "a.png",
            "b.jpg",
        ]);
        assert!(cli.policy);
        assert_eq!(cli.offset, -0.05);
        assert_eq!(cli.images.len(), 2);
        assert!(cli.threshold.is_empty());
    }

    #[test]
    fn parses_threshold_list() {
        let cli = Cli::parse_from(["check_image", "--threshold", "0.1,-0.2,0.3", "a.png"]);
        assert_eq!(cli.threshold, vec![0.1, -0.2, 0.3]);
        assert_eq!(cli.offset, DEFAULT_OFFSET);
    }

    #[test]
    fn requires_an_image() {
        assert!(Cli::try_parse_from(["check_image"]).is_err());
    }
}
