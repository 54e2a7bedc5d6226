//! Boundaries with the landmark detector and the embedding network.
//!
//! Both run outside this crate. Their failures are returned as-is; the only
//! non-error "no result" is a detector reporting no face.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use serde::Deserialize;

use crate::features::FeatureVector;
use crate::geometry::{LandmarkSet, Point};

pub trait LandmarkDetector {
    /// `Ok(None)` when no face was found.
    fn detect(&mut self, img: &DynamicImage) -> Result<Option<LandmarkSet>>;
}

pub trait EmbeddingModel {
    fn embed(&mut self, img: &DynamicImage) -> Result<FeatureVector>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Pair([f64; 2]),
    Object { x: f64, y: f64 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLandmarks {
    List(Vec<Option<RawPoint>>),
    Wrapped { landmarks: Vec<Option<RawPoint>> },
}

/// Parse a landmark dump: a JSON array of `[x, y]` pairs or `{"x", "y"}`
/// objects, `null` for unresolved points, optionally wrapped in
/// `{"landmarks": [...]}`.
pub fn parse_landmarks(json: &str) -> Result<LandmarkSet> {
    let raw: RawLandmarks = serde_json::from_str(json).context("parsing landmarks")?;
    let points = match raw {
        RawLandmarks::List(points) | RawLandmarks::Wrapped { landmarks: points } => points,
    };
    Ok(LandmarkSet::new(
        points
            .into_iter()
            .map(|p| {
                p.map(|p| match p {
                    RawPoint::Pair([x, y]) | RawPoint::Object { x, y } => Point::new(x, y),
                })
            })
            .collect(),
    ))
}

/// Detector output precomputed by an external tool and stored as JSON.
pub struct LandmarkFile {
    path: PathBuf,
    normalized: bool,
}

impl LandmarkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            normalized: false,
        }
    }

    /// Coordinates are in [0, 1] and get multiplied by the image size.
    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }
}

impl LandmarkDetector for LandmarkFile {
    fn detect(&mut self, img: &DynamicImage) -> Result<Option<LandmarkSet>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading landmarks {}", self.path.display()))?;
        let landmarks = parse_landmarks(&raw)
            .with_context(|| format!("in {}", self.path.display()))?;

        if landmarks.is_empty() {
            return Ok(None);
        }

        if !self.normalized {
            return Ok(Some(landmarks));
        }

        let (width, height) = img.dimensions();
        let points = (0..landmarks.len())
            .map(|id| {
                landmarks
                    .get(id)
                    .map(|p| Point::new(p.x * width as f64, p.y * height as f64))
            })
            .collect();
        Ok(Some(LandmarkSet::new(points)))
    }
}
