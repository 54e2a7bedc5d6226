use anyhow::{Context, Result};
use directories::ProjectDirs;
use dermacheck_vision::buffer::DEFAULT_MAX_SIDE;
use dermacheck_vision::reference::DEFAULT_K;
use dermacheck_vision::{NearestCentroid, NearestNeighbors, ReferenceClassifier};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("", "", "dermacheck"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("DERMACHECK_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("dermacheck.toml")),
});

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| match option_env!("DERMACHECK_DATA_DIR") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".dermacheck")),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Centroid,
    Knn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSource {
    /// 25-value vectors built from zone metrics.
    Metrics,
    /// Output of an external embedding network.
    Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub enabled: bool,
    pub classifier: ClassifierKind,
    pub k: usize,
    pub features: FeatureSource,
    pub embedding_model: Option<PathBuf>,
    pub embedding_input_size: u32,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            classifier: ClassifierKind::Centroid,
            k: DEFAULT_K,
            features: FeatureSource::Metrics,
            embedding_model: None,
            embedding_input_size: 224,
        }
    }
}

impl ReferenceConfig {
    pub fn classifier(&self) -> Box<dyn ReferenceClassifier> {
        match self.classifier {
            ClassifierKind::Centroid => Box::new(NearestCentroid),
            ClassifierKind::Knn => Box::new(NearestNeighbors { k: self.k }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Images are scaled down so neither side exceeds this.
    pub max_image_size: u32,
    pub reference: ReferenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_image_size: DEFAULT_MAX_SIDE,
            reference: ReferenceConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_image_size > 0, "max_image_size must be at least 1");
        anyhow::ensure!(self.reference.k > 0, "reference.k must be at least 1");
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = load_config(Some(&dir.path().join("absent.toml")))?;
        assert_eq!(cfg.max_image_size, 800);
        assert_eq!(cfg.reference.classifier, ClassifierKind::Centroid);
        assert_eq!(cfg.reference.k, 5);
        Ok(())
    }

    #[test]
    fn test_partial_file() -> Result<()> {
        let cfg: Config = toml::from_str("[reference]\nclassifier = \"knn\"\nk = 3\n")?;
        assert_eq!(cfg.max_image_size, 800);
        assert_eq!(cfg.reference.classifier, ClassifierKind::Knn);
        assert_eq!(cfg.reference.k, 3);
        assert_eq!(cfg.reference.features, FeatureSource::Metrics);
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.max_image_size = 640;
        cfg.reference.features = FeatureSource::Embedding;
        cfg.reference.embedding_model = Some(PathBuf::from("/models/mobilenet.onnx"));
        save_config(&cfg, Some(&path))?;

        let loaded = load_config(Some(&path))?;
        assert_eq!(loaded.max_image_size, 640);
        assert_eq!(loaded.reference.features, FeatureSource::Embedding);
        assert_eq!(
            loaded.reference.embedding_model.as_deref(),
            Some(Path::new("/models/mobilenet.onnx"))
        );
        Ok(())
    }

    #[test]
    fn test_zero_sizes_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "max_image_size = 0\n")?;
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("max_image_size"));

        std::fs::write(&path, "[reference]\nk = 0\n")?;
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("reference.k"));

        std::fs::write(&path, "max_image_size = 1\n")?;
        assert_eq!(load_config(Some(&path))?.max_image_size, 1);
        Ok(())
    }
}
