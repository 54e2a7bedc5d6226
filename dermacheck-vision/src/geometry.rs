//! Facial zone geometry.
//!
//! Zones are built from a MediaPipe FaceMesh style landmark set (468 points).
//! Each zone is a fixed table of landmark ids describing one or more closed
//! rings. Cheeks and eyes are two disjoint rings; membership across rings uses
//! the even-odd rule, which for disjoint rings is their union.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Landmarks as produced by the external detector, indexed by detector id.
///
/// `None` marks a point the detector could not resolve.
#[derive(Debug, Clone, Default)]
pub struct LandmarkSet {
    points: Vec<Option<Point>>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Option<Point>>) -> Self {
        Self { points }
    }

    pub fn from_xy<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self {
            points: points
                .into_iter()
                .map(|(x, y)| Some(Point::new(x, y)))
                .collect(),
        }
    }

    /// Landmark by id. Out-of-range ids and non-finite coordinates are missing.
    pub fn get(&self, id: usize) -> Option<Point> {
        self.points
            .get(id)
            .copied()
            .flatten()
            .filter(Point::is_finite)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no landmark was resolved at all.
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|p| p.is_none())
    }

    /// Rescale every landmark, e.g. after the source image was resized.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| p.map(|p| Point::new(p.x * factor, p.y * factor)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    TZone,
    Cheeks,
    Eyes,
    Lips,
    Chin,
}

impl Zone {
    /// Fixed iteration order. Aggregation tie-breaks and vector layout depend on it.
    pub const ALL: [Zone; 5] = [Zone::TZone, Zone::Cheeks, Zone::Eyes, Zone::Lips, Zone::Chin];

    pub fn name(self) -> &'static str {
        match self {
            Zone::TZone => "T-zone",
            Zone::Cheeks => "Cheeks",
            Zone::Eyes => "Eye contour",
            Zone::Lips => "Lips",
            Zone::Chin => "Chin",
        }
    }

    /// Landmark ids of each ring bounding this zone.
    pub fn landmark_rings(self) -> &'static [&'static [usize]] {
        match self {
            Zone::TZone => &[T_ZONE],
            Zone::Cheeks => &[RIGHT_CHEEK, LEFT_CHEEK],
            Zone::Eyes => &[RIGHT_EYE_AREA, LEFT_EYE_AREA],
            Zone::Lips => &[OUTER_LIPS],
            Zone::Chin => &[CHIN],
        }
    }
}

// Forehead band down the nose bridge to the tip.
const T_ZONE: &[usize] = &[
    103, 67, 109, 10, 338, 297, 332, 334, 296, 336, 285, 417, 351, 419, 248, 281, 275, 4, 45,
    51, 3, 196, 122, 193, 55, 107, 66, 105,
];
const RIGHT_CHEEK: &[usize] = &[116, 117, 118, 101, 36, 205, 187, 123];
const LEFT_CHEEK: &[usize] = &[345, 346, 347, 330, 266, 425, 411, 352];
// Skin ring around each eye, not the eyeball itself.
const RIGHT_EYE_AREA: &[usize] = &[
    226, 113, 225, 224, 223, 222, 221, 189, 244, 233, 232, 231, 230, 229, 228, 31,
];
const LEFT_EYE_AREA: &[usize] = &[
    446, 342, 445, 444, 443, 442, 441, 413, 464, 453, 452, 451, 450, 449, 448, 261,
];
const OUTER_LIPS: &[usize] = &[
    61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291, 375, 321, 405, 314, 17, 84, 181, 91, 146,
];
const CHIN: &[usize] = &[
    172, 136, 150, 149, 176, 148, 152, 377, 400, 378, 379, 365, 397, 200,
];

/// One value per zone. Exactly the five zones, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerZone<T> {
    pub t_zone: T,
    pub cheeks: T,
    pub eyes: T,
    pub lips: T,
    pub chin: T,
}

impl<T> PerZone<T> {
    pub fn from_fn(mut f: impl FnMut(Zone) -> T) -> Self {
        Self {
            t_zone: f(Zone::TZone),
            cheeks: f(Zone::Cheeks),
            eyes: f(Zone::Eyes),
            lips: f(Zone::Lips),
            chin: f(Zone::Chin),
        }
    }

    pub fn get(&self, zone: Zone) -> &T {
        match zone {
            Zone::TZone => &self.t_zone,
            Zone::Cheeks => &self.cheeks,
            Zone::Eyes => &self.eyes,
            Zone::Lips => &self.lips,
            Zone::Chin => &self.chin,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PerZone<U> {
        PerZone::from_fn(|zone| f(self.get(zone)))
    }

    /// Values in `Zone::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &T)> {
        Zone::ALL.into_iter().map(move |zone| (zone, self.get(zone)))
    }
}

/// Boundary of one zone: zero or more rings of valid points.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub zone: Zone,
    pub rings: Vec<Vec<Point>>,
}

impl ZonePolygon {
    /// Rectangle covering a whole `width` x `height` frame.
    pub fn whole_frame(zone: Zone, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            zone,
            rings: vec![vec![
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ]],
        }
    }

    /// A polygon without any usable ring covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.rings.iter().flatten()
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }

    /// True when no ring crosses itself.
    pub fn is_simple(&self) -> bool {
        self.rings.iter().all(|ring| ring_is_simple(ring))
    }

    /// Even-odd membership over the edges of every ring.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.rings
            .iter()
            .fold(false, |inside, ring| inside != point_in_polygon(x, y, ring))
    }
}

/// Standard ray casting. Fewer than three vertices never contain a point.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    if polygon.len() < 3 || !polygon.iter().all(Point::is_finite) {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if ((pi.y > y) != (pj.y > y)) && (x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Segments cross at a single interior point. Touching or collinear overlap
/// does not count.
fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    orientation(q1, q2, p1) * orientation(q1, q2, p2) < 0.0
        && orientation(p1, p2, q1) * orientation(p1, p2, q2) < 0.0
}

/// True when no two non-adjacent edges of the closed ring cross.
///
/// Even-odd filling of a ring that loops over itself leaves holes where the
/// ring overlaps, so those pixels would be skipped.
pub fn ring_is_simple(ring: &[Point]) -> bool {
    let n = ring.len();
    let edge = |i: usize| (ring[i], ring[(i + 1) % n]);
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let ((p1, p2), (q1, q2)) = (edge(i), edge(j));
            if segments_cross(p1, p2, q1, q2) {
                return false;
            }
        }
    }
    true
}

/// Build the polygon for `zone`, silently dropping unresolved landmarks.
pub fn extract_zone(zone: Zone, landmarks: &LandmarkSet) -> ZonePolygon {
    let rings: Vec<Vec<Point>> = zone
        .landmark_rings()
        .iter()
        .map(|ids| ids.iter().filter_map(|&id| landmarks.get(id)).collect::<Vec<_>>())
        .filter(|ring| ring.len() >= 3)
        .collect();

    if !rings.iter().all(|ring| ring_is_simple(ring)) {
        log::warn!(
            "{} landmarks cross over themselves, part of the zone will be skipped",
            zone.name()
        );
    }
    ZonePolygon { zone, rings }
}

pub fn extract_zones(landmarks: &LandmarkSet) -> PerZone<ZonePolygon> {
    PerZone::from_fn(|zone| extract_zone(zone, landmarks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_point_in_square() {
        let poly = square(0.0, 0.0, 10.0);
        assert!(point_in_polygon(5.0, 5.0, &poly));
        assert!(point_in_polygon(0.0, 0.0, &poly));
        assert!(!point_in_polygon(10.0, 5.0, &poly));
        assert!(!point_in_polygon(-1.0, 5.0, &poly));
        assert!(!point_in_polygon(5.0, 11.0, &poly));
    }

    #[test]
    fn test_degenerate_polygon() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(5.0, 5.0, &line));
        assert!(!point_in_polygon(0.0, 0.0, &[]));

        let mut poly = square(0.0, 0.0, 10.0);
        poly[2].x = f64::NAN;
        assert!(!point_in_polygon(1.0, 1.0, &poly));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening upwards
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 7.0),
            Point::new(7.0, 7.0),
            Point::new(7.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(1.0, 5.0, &poly));
        assert!(!point_in_polygon(5.0, 3.0, &poly));
        assert!(point_in_polygon(5.0, 8.0, &poly));
    }

    #[test]
    fn test_self_crossing_rings() {
        assert!(ring_is_simple(&square(0.0, 0.0, 10.0)));
        assert!(ring_is_simple(&square(0.0, 0.0, 10.0)[..3]));

        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(!ring_is_simple(&bowtie));

        // Star drawn through every other vertex: its core is covered twice and
        // even-odd drops it.
        let star: Vec<Point> = [0, 2, 4, 1, 3]
            .iter()
            .map(|&k| {
                let angle = k as f64 / 5.0 * std::f64::consts::TAU;
                Point::new(10.0 * angle.cos(), 10.0 * angle.sin())
            })
            .collect();
        assert!(!ring_is_simple(&star));
        assert!(!point_in_polygon(0.0, 0.0, &star));
    }

    #[test]
    fn test_tables_trace_simple_rings() {
        // Lay every ring's ids out in table order around its own circle.
        let mut points = vec![None; 468];
        for (k, zone) in Zone::ALL.into_iter().enumerate() {
            for (r, ring) in zone.landmark_rings().iter().enumerate() {
                let (cx, cy) = (50.0 * k as f64, 50.0 * r as f64);
                for (i, &id) in ring.iter().enumerate() {
                    let angle = i as f64 / ring.len() as f64 * std::f64::consts::TAU;
                    let (x, y) = (cx + 10.0 * angle.cos(), cy + 10.0 * angle.sin());
                    points[id] = Some(Point::new(x, y));
                }
            }
        }
        let landmarks = LandmarkSet::new(points.clone());
        for (_, polygon) in extract_zones(&landmarks).iter() {
            assert!(polygon.is_simple());
        }

        // Two landmarks swapped out of contour order make the lips cross.
        points.swap(OUTER_LIPS[2], OUTER_LIPS[12]);
        let lips = extract_zone(Zone::Lips, &LandmarkSet::new(points));
        assert!(!lips.is_simple());
    }

    #[test]
    fn test_two_rings_union() {
        let zone = ZonePolygon {
            zone: Zone::Cheeks,
            rings: vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)],
        };
        assert!(zone.contains(5.0, 5.0));
        assert!(zone.contains(25.0, 5.0));
        assert!(!zone.contains(15.0, 5.0));
        assert_eq!(zone.bounds(), Some((0.0, 0.0, 30.0, 10.0)));
    }

    #[test]
    fn test_missing_landmarks_filtered() {
        let mut points: Vec<Option<Point>> = (0..468)
            .map(|i| Some(Point::new(i as f64, (i * 2) as f64)))
            .collect();
        points[0] = None;
        points[17] = Some(Point::new(f64::NAN, 1.0));
        let landmarks = LandmarkSet::new(points);

        let lips = extract_zone(Zone::Lips, &landmarks);
        assert_eq!(lips.rings.len(), 1);
        assert_eq!(lips.rings[0].len(), OUTER_LIPS.len() - 2);

        let cheeks = extract_zone(Zone::Cheeks, &landmarks);
        assert_eq!(cheeks.rings.len(), 2);
    }

    #[test]
    fn test_short_landmark_set_degrades() {
        let landmarks = LandmarkSet::from_xy((0..5).map(|i| (i as f64, i as f64)));
        for (_, polygon) in extract_zones(&landmarks).iter() {
            assert!(polygon.is_empty());
            assert_eq!(polygon.bounds(), None);
        }
        assert!(LandmarkSet::default().is_empty());
    }

    #[test]
    fn test_landmark_tables_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for zone in Zone::ALL {
            for ring in zone.landmark_rings() {
                for &id in ring.iter() {
                    assert!(id < 468, "{} out of range", id);
                    assert!(seen.insert(id), "{} used twice", id);
                }
            }
        }
    }

    #[test]
    fn test_per_zone_order() {
        let zones = PerZone::from_fn(|z| z);
        let order: Vec<Zone> = zones.iter().map(|(z, _)| z).collect();
        assert_eq!(order, Zone::ALL.to_vec());
    }
}
