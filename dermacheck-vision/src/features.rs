use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::geometry::PerZone;
use crate::region::ZoneMetrics;

/// Values per zone in a metrics vector.
pub const METRICS_PER_ZONE: usize = 5;
/// Length of a metrics vector: five zones, five metrics each.
pub const METRICS_VECTOR_LEN: usize = 5 * METRICS_PER_ZONE;

const DISTANCE_EPSILON: f32 = 1e-8;

/// Fixed-length numeric description of a face, from zone metrics or from an
/// embedding network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub vector: Array1<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            vector: Array1::from_vec(values),
        }
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.vector.view()
    }
}

impl From<Array1<f32>> for FeatureVector {
    fn from(vector: Array1<f32>) -> Self {
        Self { vector }
    }
}

/// Normalize one zone's metrics to [0, 1] each, in the fixed order
/// brightness, texture, redness, uniformity, saturation.
fn normalize(m: &ZoneMetrics) -> [f32; METRICS_PER_ZONE] {
    [
        (m.brightness.clamp(0.0, 255.0) / 255.0) as f32,
        (m.texture.clamp(0.0, 50.0) / 50.0) as f32,
        ((m.redness.clamp(-50.0, 50.0) + 50.0) / 100.0) as f32,
        (m.uniformity.clamp(0.0, 50.0) / 50.0) as f32,
        m.saturation.clamp(0.0, 1.0) as f32,
    ]
}

/// Flatten per-zone metrics into a 25-dimensional vector in zone order.
pub fn vectorize(metrics: &PerZone<ZoneMetrics>) -> FeatureVector {
    FeatureVector::new(
        metrics
            .iter()
            .flat_map(|(_, m)| normalize(m))
            .collect(),
    )
}

/// `1 - cos(a, b)`, in [0, 2]. `None` when the lengths differ.
pub fn cosine_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot = a.dot(&b);
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    Some(1.0 - dot / norm.max(DISTANCE_EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics() -> PerZone<ZoneMetrics> {
        PerZone::from_fn(|zone| ZoneMetrics {
            brightness: 120.0 + zone as u8 as f64 * 10.0,
            redness: -10.0,
            texture: 12.5,
            uniformity: 60.0,
            saturation: 0.2,
            pixel_count: 10,
            ..ZoneMetrics::default()
        })
    }

    #[test]
    fn test_vector_layout() {
        let v = vectorize(&sample_metrics());
        assert_eq!(v.len(), METRICS_VECTOR_LEN);
        let first = &v.vector.as_slice().unwrap()[..5];
        assert!((first[0] - 120.0 / 255.0).abs() < 1e-6);
        assert!((first[1] - 0.25).abs() < 1e-6);
        assert!((first[2] - 0.4).abs() < 1e-6);
        // uniformity clamps to 50
        assert_eq!(first[3], 1.0);
        assert!((first[4] - 0.2).abs() < 1e-6);
        assert!((v.vector[5] - 130.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_vectorize_is_pure() {
        let m = sample_metrics();
        assert_eq!(vectorize(&m), vectorize(&m));
    }

    #[test]
    fn test_zero_metrics_vector() {
        let v = vectorize(&PerZone::default());
        // Only the redness slot is non-zero: (0 + 50) / 100.
        assert_eq!(v.vector.iter().filter(|&&x| x != 0.0).count(), 5);
    }

    #[test]
    fn test_cosine_distance() {
        let a = FeatureVector::new(vec![1.0, 0.0, 0.0]);
        let b = FeatureVector::new(vec![0.0, 1.0, 0.0]);
        let c = FeatureVector::new(vec![-2.0, 0.0, 0.0]);
        let d = |x: &FeatureVector, y: &FeatureVector| {
            cosine_distance(x.view(), y.view()).unwrap()
        };
        assert!(d(&a, &a).abs() < 1e-6);
        assert!((d(&a, &b) - 1.0).abs() < 1e-6);
        assert!((d(&a, &c) - 2.0).abs() < 1e-6);

        let zero = FeatureVector::new(vec![0.0; 3]);
        assert_eq!(d(&zero, &a), 1.0);
    }

    #[test]
    fn test_cosine_distance_length_mismatch() {
        // Same prefix, extra trailing value: not comparable rather than identical.
        let short = FeatureVector::new(vec![1.0, 0.0]);
        let long = FeatureVector::new(vec![1.0, 0.0, 5.0]);
        assert_eq!(cosine_distance(short.view(), long.view()), None);
        assert_eq!(cosine_distance(long.view(), short.view()), None);
    }
}
