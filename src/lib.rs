pub mod config;
pub mod recommend;
pub mod report;
pub mod storage;

// Re-export vision types for convenience
pub use dermacheck_vision::{
    analyze, analyze_whole_frame, vectorize, FeatureVector, Library, Pipeline, Prediction,
    SkinAnalysis, SkinLabel, Zone,
};
