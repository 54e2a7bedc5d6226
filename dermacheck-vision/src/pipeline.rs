use anyhow::{Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::buffer::{scale_to_fit, PixelBuffer};
use crate::classify::{classify, SkinLabel};
use crate::detector::LandmarkDetector;
use crate::geometry::{extract_zone, LandmarkSet, PerZone, Zone, ZonePolygon};
use crate::region::{compute_metrics, ZoneMetrics};

/// Result of a zone analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinAnalysis {
    pub per_zone: PerZone<SkinLabel>,
    pub metrics: PerZone<ZoneMetrics>,
    pub overall: SkinLabel,
    /// Percent, one of 95, 85, 75, 65.
    pub confidence: u8,
}

impl SkinAnalysis {
    fn from_metrics(metrics: PerZone<ZoneMetrics>) -> Self {
        let per_zone = metrics.map(classify);
        for (zone, label) in per_zone.iter() {
            let m = metrics.get(zone);
            log::debug!(
                "{}: {} (brightness={:.1} redness={:.1} texture={:.1} uniformity={:.1} pixels={})",
                zone.name(),
                label,
                m.brightness,
                m.redness,
                m.texture,
                m.uniformity,
                m.pixel_count
            );
        }
        Self {
            overall: determine_overall(&per_zone),
            confidence: confidence(&per_zone),
            per_zone,
            metrics,
        }
    }
}

/// Run geometry, statistics and classification for every zone.
pub fn analyze(landmarks: &LandmarkSet, buffer: &PixelBuffer) -> SkinAnalysis {
    SkinAnalysis::from_metrics(zone_metrics(landmarks, buffer))
}

pub fn zone_metrics(landmarks: &LandmarkSet, buffer: &PixelBuffer) -> PerZone<ZoneMetrics> {
    PerZone::from_fn(|zone| compute_metrics(buffer, &extract_zone(zone, landmarks)))
}

/// Landmark-free mode: the whole frame is one region and its label stands in
/// for every zone.
pub fn analyze_whole_frame(buffer: &PixelBuffer) -> SkinAnalysis {
    SkinAnalysis::from_metrics(whole_frame_metrics(buffer))
}

pub fn whole_frame_metrics(buffer: &PixelBuffer) -> PerZone<ZoneMetrics> {
    let frame = ZonePolygon::whole_frame(Zone::TZone, buffer.width(), buffer.height());
    let metrics = compute_metrics(buffer, &frame);
    PerZone::from_fn(|_| metrics)
}

/// Most frequent label. Ties go to the label seen first in zone order.
pub fn determine_overall(labels: &PerZone<SkinLabel>) -> SkinLabel {
    let mut counts: Vec<(SkinLabel, usize)> = Vec::with_capacity(Zone::ALL.len());
    for (_, &label) in labels.iter() {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
        .iter()
        .fold(None, |best: Option<(SkinLabel, usize)>, &(label, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((label, n)),
        })
        .map(|(label, _)| label)
        .unwrap_or(labels.t_zone)
}

/// Coarse agreement score from the number of distinct zone labels.
pub fn confidence(labels: &PerZone<SkinLabel>) -> u8 {
    let mut distinct: Vec<SkinLabel> = Vec::with_capacity(Zone::ALL.len());
    for (_, &label) in labels.iter() {
        if !distinct.contains(&label) {
            distinct.push(label);
        }
    }
    match distinct.len() {
        1 => 95,
        2 => 85,
        3 => 75,
        _ => 65,
    }
}

/// Detect landmarks, then analyze the scaled image.
pub struct Pipeline {
    pub detector: Box<dyn LandmarkDetector>,
    pub max_side: u32,
}

impl Pipeline {
    pub fn new(detector: Box<dyn LandmarkDetector>, max_side: u32) -> Self {
        Self { detector, max_side }
    }

    /// `Ok(None)` when the detector found no face. Detector errors propagate.
    pub fn process_image(&mut self, img: &DynamicImage) -> Result<Option<SkinAnalysis>> {
        let Some(landmarks) = self.detector.detect(img).context("detecting landmarks")? else {
            return Ok(None);
        };

        let (scaled, factor) = scale_to_fit(img, self.max_side);
        let buffer = PixelBuffer::from_image(&scaled);
        Ok(Some(analyze(&landmarks.scaled(factor), &buffer)))
    }
}
