//! ONNX embedding network, used as the feature source for neighbour search.

use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::Value,
};

use crate::detector::EmbeddingModel;
use crate::features::FeatureVector;

pub fn session_builder() -> Result<SessionBuilder> {
    #[allow(unused_mut)]
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        use ort::ep::{self, ExecutionProvider};

        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        use ort::ep::{self, ExecutionProvider};

        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

/// Image classifier backbone (e.g. MobileNet) cut before its head.
pub struct OnnxEmbedder {
    session: Session,
    input_size: u32,
}

impl OnnxEmbedder {
    pub fn from_file(path: &Path, input_size: u32) -> Result<Self> {
        let session = session_builder()?
            .commit_from_file(path)
            .with_context(|| format!("load embedding model {}", path.display()))?;
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn embed(&mut self, img: &DynamicImage) -> Result<FeatureVector> {
        let size = self.input_size;
        let rgb = img
            .resize_exact(size, size, image::imageops::FilterType::Triangle)
            .to_rgb8();

        // CHW, RGB, scaled to [-1, 1]
        let pixel_count = (size * size) as usize;
        let mut input_data = vec![0.0f32; 3 * pixel_count];
        for (i, px) in rgb.as_raw().chunks_exact(3).enumerate() {
            for (c, &value) in px.iter().enumerate() {
                input_data[c * pixel_count + i] = value as f32 / 127.5 - 1.0;
            }
        }

        let input_array =
            Array4::from_shape_vec((1, 3, size as usize, size as usize), input_data)?;
        let input_tensor = Value::from_array(input_array)?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let embedding: Vec<f32> = data.to_vec();
        if embedding.is_empty() {
            anyhow::bail!("embedding model returned an empty tensor");
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            embedding.iter().map(|x| x / norm).collect()
        } else {
            embedding
        };

        Ok(FeatureVector::new(normalized))
    }
}
