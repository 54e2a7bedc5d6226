//! Photometric statistics over the interior of a zone polygon.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::geometry::ZonePolygon;

/// Pixels darker than this are treated as shadow and skipped.
const MIN_LUMINANCE: f64 = 30.0;
/// Pixels brighter than this are treated as specular highlights and skipped.
const MAX_LUMINANCE: f64 = 240.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneMetrics {
    /// Mean luminance.
    pub brightness: f64,
    pub redness: f64,
    /// Standard deviation of luminance.
    pub texture: f64,
    /// Mean absolute per-channel deviation from the mean colour.
    pub uniformity: f64,
    /// In [0, 1].
    pub saturation: f64,
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    pub pixel_count: usize,
}

impl ZoneMetrics {
    /// Sentinel for regions with no usable pixel.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.pixel_count == 0
    }
}

#[inline]
pub fn luminance(rgb: [u8; 3]) -> f64 {
    0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64
}

/// Colour and luminance of every pixel inside `polygon` that passes the
/// luminance window.
fn sample_pixels<'a>(
    buffer: &'a PixelBuffer,
    polygon: &'a ZonePolygon,
) -> impl Iterator<Item = ([u8; 3], f64)> + 'a {
    let (x0, y0, x1, y1) = clamped_bounds(buffer, polygon);
    (y0..y1)
        .flat_map(move |y| (x0..x1).map(move |x| (x, y)))
        .filter(move |&(x, y)| polygon.contains(x as f64, y as f64))
        .map(move |(x, y)| {
            let rgb = buffer.rgb(x, y);
            (rgb, luminance(rgb))
        })
        .filter(|&(_, lum)| lum > MIN_LUMINANCE && lum < MAX_LUMINANCE)
}

/// Half-open pixel range covering the polygon bounds, clipped to the buffer.
fn clamped_bounds(buffer: &PixelBuffer, polygon: &ZonePolygon) -> (u32, u32, u32, u32) {
    let Some((min_x, min_y, max_x, max_y)) = polygon.bounds() else {
        return (0, 0, 0, 0);
    };
    let clamp = |v: f64, limit: u32| v.max(0.0).min(limit as f64) as u32;
    (
        clamp(min_x.floor(), buffer.width()),
        clamp(min_y.floor(), buffer.height()),
        clamp(max_x.ceil() + 1.0, buffer.width()),
        clamp(max_y.ceil() + 1.0, buffer.height()),
    )
}

/// Two-pass moment computation over the zone's qualifying pixels.
pub fn compute_metrics(buffer: &PixelBuffer, polygon: &ZonePolygon) -> ZoneMetrics {
    if polygon.is_empty() {
        return ZoneMetrics::zero();
    }

    let mut sum = [0.0f64; 3];
    let mut lum_sum = 0.0;
    let mut count = 0usize;
    for (rgb, lum) in sample_pixels(buffer, polygon) {
        for (acc, &c) in sum.iter_mut().zip(rgb.iter()) {
            *acc += c as f64;
        }
        lum_sum += lum;
        count += 1;
    }

    if count == 0 {
        return ZoneMetrics::zero();
    }

    let n = count as f64;
    let mean = [sum[0] / n, sum[1] / n, sum[2] / n];
    let mean_lum = lum_sum / n;

    let mut variance_sum = 0.0;
    let mut uniformity_sum = 0.0;
    for (rgb, lum) in sample_pixels(buffer, polygon) {
        variance_sum += (lum - mean_lum).powi(2);
        let deviation: f64 = rgb
            .iter()
            .zip(mean.iter())
            .map(|(&c, &m)| (c as f64 - m).abs())
            .sum();
        uniformity_sum += deviation / 3.0;
    }

    let [mean_r, mean_g, mean_b] = mean;
    let max = mean_r.max(mean_g).max(mean_b);
    let min = mean_r.min(mean_g).min(mean_b);

    ZoneMetrics {
        brightness: mean_lum,
        redness: (mean_r - mean_g) + (mean_r - mean_b) / 2.0,
        texture: (variance_sum / n).sqrt(),
        uniformity: uniformity_sum / n,
        saturation: if max > 0.0 { (max - min) / max } else { 0.0 },
        mean_r,
        mean_g,
        mean_b,
        pixel_count: count,
    }
}
