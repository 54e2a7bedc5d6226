//! User-curated reference categories and the classifiers that query them.
//!
//! A [`Library`] owns the example vectors. Classifiers only read it, so a
//! different search structure can be swapped in behind [`ReferenceClassifier`]
//! without touching callers.

use std::borrow::Cow;
use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::features::{cosine_distance, FeatureVector};

pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    name: String,
    examples: Vec<FeatureVector>,
    /// Mean of `examples`; cleared whenever an example is added.
    #[serde(skip)]
    centroid: Option<FeatureVector>,
}

impl Category {
    fn new(name: String) -> Self {
        Self {
            name,
            examples: Vec::new(),
            centroid: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn examples(&self) -> &[FeatureVector] {
        &self.examples
    }

    pub fn cached_centroid(&self) -> Option<&FeatureVector> {
        self.centroid.as_ref()
    }

    /// Arithmetic mean of the examples, `None` for an empty category.
    pub fn compute_centroid(&self) -> Option<FeatureVector> {
        let first = self.examples.first()?;
        let mut sum = Array1::<f32>::zeros(first.len());
        for example in &self.examples {
            sum += &example.vector;
        }
        Some(FeatureVector::from(sum / self.examples.len() as f32))
    }

    /// Cached centroid, or a freshly computed one when the cache is stale.
    pub fn centroid(&self) -> Option<Cow<'_, FeatureVector>> {
        match &self.centroid {
            Some(c) => Some(Cow::Borrowed(c)),
            None => self.compute_centroid().map(Cow::Owned),
        }
    }

    pub fn rebuild_centroid(&mut self) {
        self.centroid = self.compute_centroid();
    }
}

/// Category names are compared trimmed and lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    categories: BTreeMap<String, Category>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the normalized name.
    pub fn add_category(&mut self, name: &str) -> Result<String, LibraryError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if self.categories.contains_key(&name) {
            return Err(LibraryError::DuplicateCategory(name));
        }
        self.categories.insert(name.clone(), Category::new(name.clone()));
        Ok(name)
    }

    /// Append examples, creating the category if needed. Either every vector
    /// is added or none is. Returns how many were added.
    pub fn add_examples(
        &mut self,
        category: &str,
        examples: Vec<FeatureVector>,
    ) -> Result<usize, LibraryError> {
        let name = normalize_name(category);
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }

        let expected = self
            .dimension()
            .or_else(|| examples.first().map(FeatureVector::len));
        if let Some(expected) = expected {
            if let Some(bad) = examples.iter().find(|v| v.len() != expected) {
                return Err(LibraryError::DimensionMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }

        let added = examples.len();
        let entry = self
            .categories
            .entry(name.clone())
            .or_insert_with(|| Category::new(name));
        entry.examples.extend(examples);
        if added > 0 {
            entry.centroid = None;
        }
        Ok(added)
    }

    /// Category name to number of examples.
    pub fn list_categories(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(name, c)| (name.clone(), c.examples.len()))
            .collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(&normalize_name(name))
    }

    /// Dimension shared by every stored vector.
    pub fn dimension(&self) -> Option<usize> {
        self.categories()
            .flat_map(|c| c.examples.first())
            .map(FeatureVector::len)
            .next()
    }

    pub fn total_examples(&self) -> usize {
        self.categories().map(|c| c.examples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_examples() == 0
    }

    pub fn rebuild_centroids(&mut self) {
        for category in self.categories.values_mut() {
            category.rebuild_centroid();
        }
    }

    /// Nearest-centroid prediction.
    pub fn predict(&self, query: &FeatureVector) -> Option<Prediction> {
        NearestCentroid.predict(self, query)
    }

    fn accepts(&self, query: &FeatureVector) -> bool {
        self.dimension() == Some(query.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// Cosine distance to the winning centroid.
    Distance(f32),
    /// Share of neighbour votes, percent.
    Confidence(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub category: String,
    pub evidence: Evidence,
}

pub trait ReferenceClassifier {
    /// `None` when the library has nothing comparable to `query`.
    fn predict(&self, library: &Library, query: &FeatureVector) -> Option<Prediction>;
}

/// Lowest cosine distance to a category centroid wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestCentroid;

impl ReferenceClassifier for NearestCentroid {
    fn predict(&self, library: &Library, query: &FeatureVector) -> Option<Prediction> {
        if !library.accepts(query) {
            return None;
        }

        let mut best: Option<(&str, f32)> = None;
        for category in library.categories() {
            let Some(centroid) = category.centroid() else {
                continue;
            };
            let Some(distance) = cosine_distance(query.view(), centroid.view()) else {
                continue;
            };
            log::debug!("centroid distance to {}: {:.4}", category.name(), distance);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((category.name(), distance));
            }
        }

        best.map(|(name, distance)| Prediction {
            category: name.to_string(),
            evidence: Evidence::Distance(distance),
        })
    }
}

/// Majority vote among the `k` closest examples.
#[derive(Debug, Clone, Copy)]
pub struct NearestNeighbors {
    pub k: usize,
}

impl Default for NearestNeighbors {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

impl ReferenceClassifier for NearestNeighbors {
    fn predict(&self, library: &Library, query: &FeatureVector) -> Option<Prediction> {
        if !library.accepts(query) || self.k == 0 {
            return None;
        }

        let mut neighbors: Vec<(f32, &str)> = library
            .categories()
            .flat_map(move |c| {
                c.examples()
                    .iter()
                    .filter_map(move |e| {
                        let distance = cosine_distance(query.view(), e.view())?;
                        Some((distance, c.name()))
                    })
            })
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(self.k);
        let k = neighbors.len();

        // (label, votes); insertion order is rank of the label's closest neighbour
        let mut votes: Vec<(&str, usize)> = Vec::new();
        for &(_, name) in &neighbors {
            match votes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, count)) => *count += 1,
                None => votes.push((name, 1)),
            }
        }

        let (name, count) = votes
            .into_iter()
            .fold(None, |best: Option<(&str, usize)>, (name, count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((name, count)),
            })?;

        Some(Prediction {
            category: name.to_string(),
            evidence: Evidence::Confidence((count as f32 * 100.0 / k as f32).round() as u8),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f32]) -> FeatureVector {
        FeatureVector::new(values.to_vec())
    }

    #[test]
    fn test_add_category_normalizes() {
        let mut lib = Library::new();
        assert_eq!(lib.add_category("  Oily Skin ").unwrap(), "oily skin");
        assert_eq!(
            lib.add_category("OILY SKIN"),
            Err(LibraryError::DuplicateCategory("oily skin".into()))
        );
        assert_eq!(lib.add_category("   "), Err(LibraryError::EmptyName));
        assert_eq!(lib.list_categories().get("oily skin"), Some(&0));
    }

    #[test]
    fn test_dimension_mismatch_is_atomic() {
        let mut lib = Library::new();
        lib.add_examples("dry", vec![v(&[1.0, 0.0])]).unwrap();
        let err = lib
            .add_examples("dry", vec![v(&[1.0, 1.0]), v(&[1.0, 1.0, 1.0])])
            .unwrap_err();
        assert_eq!(err, LibraryError::DimensionMismatch { expected: 2, found: 3 });
        assert_eq!(lib.total_examples(), 1);
    }

    #[test]
    fn test_centroid_invalidation() {
        let mut lib = Library::new();
        lib.add_examples("oily", vec![v(&[1.0, 0.0]), v(&[3.0, 2.0])]).unwrap();
        lib.rebuild_centroids();
        assert_eq!(lib.get("oily").unwrap().cached_centroid(), Some(&v(&[2.0, 1.0])));

        lib.add_examples("Oily", vec![v(&[5.0, 4.0])]).unwrap();
        let category = lib.get("oily").unwrap();
        assert!(category.cached_centroid().is_none());
        assert_eq!(category.centroid().unwrap().into_owned(), v(&[3.0, 2.0]));
    }

    #[test]
    fn test_empty_library_predicts_nothing() {
        let mut lib = Library::new();
        assert!(lib.predict(&v(&[1.0])).is_none());
        lib.add_category("normal").unwrap();
        assert!(lib.predict(&v(&[1.0])).is_none());
        assert!(NearestNeighbors::default().predict(&lib, &v(&[1.0])).is_none());
    }

    #[test]
    fn test_nearest_centroid() {
        let mut lib = Library::new();
        lib.add_examples("dry", vec![v(&[1.0, 0.1]), v(&[0.9, 0.0])]).unwrap();
        lib.add_examples("oily", vec![v(&[0.0, 1.0]), v(&[0.1, 0.9])]).unwrap();

        let prediction = lib.predict(&v(&[0.2, 1.0])).unwrap();
        assert_eq!(prediction.category, "oily");
        match prediction.evidence {
            Evidence::Distance(d) => assert!(d < 0.05),
            other => panic!("unexpected evidence {:?}", other),
        }

        // Wrong dimension is not comparable.
        assert!(lib.predict(&v(&[0.2, 1.0, 0.0])).is_none());
    }

    #[test]
    fn test_knn_vote() {
        let mut lib = Library::new();
        lib.add_examples("a", vec![v(&[1.0, 0.0]), v(&[0.95, 0.05]), v(&[0.9, 0.1])])
            .unwrap();
        lib.add_examples("b", vec![v(&[0.0, 1.0]), v(&[0.05, 0.95]), v(&[0.1, 0.9])])
            .unwrap();

        let prediction = NearestNeighbors { k: 5 }.predict(&lib, &v(&[1.0, 0.02])).unwrap();
        assert_eq!(prediction.category, "a");
        assert_eq!(prediction.evidence, Evidence::Confidence(60));

        // Fewer examples than k: vote over what exists.
        let prediction = NearestNeighbors { k: 10 }.predict(&lib, &v(&[0.0, 1.0])).unwrap();
        assert_eq!(prediction.category, "b");
        assert_eq!(prediction.evidence, Evidence::Confidence(50));
    }

    #[test]
    fn test_knn_tie_goes_to_closest() {
        let mut lib = Library::new();
        lib.add_examples("far", vec![v(&[0.0, 1.0])]).unwrap();
        lib.add_examples("near", vec![v(&[1.0, 0.1])]).unwrap();

        let prediction = NearestNeighbors { k: 2 }.predict(&lib, &v(&[1.0, 0.0])).unwrap();
        assert_eq!(prediction.category, "near");
        assert_eq!(prediction.evidence, Evidence::Confidence(50));
    }
}
