pub mod buffer;
pub mod classify;
pub mod detector;
#[cfg(feature = "onnx")]
pub mod embedder;
pub mod error;
pub mod features;
pub mod geometry;
pub mod pipeline;
pub mod reference;
pub mod region;

// Re-export commonly used types
pub use buffer::PixelBuffer;
pub use classify::{classify, SkinLabel};
pub use detector::{EmbeddingModel, LandmarkDetector, LandmarkFile};
pub use error::{BufferError, LibraryError};
pub use features::{cosine_distance, vectorize, FeatureVector};
pub use geometry::{extract_zone, LandmarkSet, PerZone, Point, Zone, ZonePolygon};
pub use pipeline::{analyze, analyze_whole_frame, Pipeline, SkinAnalysis};
pub use reference::{
    Evidence, Library, NearestCentroid, NearestNeighbors, Prediction, ReferenceClassifier,
};
pub use region::{compute_metrics, ZoneMetrics};
