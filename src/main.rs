use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dermacheck::config::{self, Config, FeatureSource, ReferenceConfig};
use dermacheck::report::Report;
use dermacheck::{storage, vectorize, FeatureVector, Pipeline, Prediction, SkinAnalysis};
use dermacheck_vision::buffer::{scale_to_fit, PixelBuffer};
use dermacheck_vision::reference::normalize_name;
use dermacheck_vision::{analyze_whole_frame, EmbeddingModel, LandmarkFile};
use image::DynamicImage;
use log::{info, warn};

#[derive(Parser)]
#[command(name = "dermacheck")]
#[command(version, about = "Skin type estimation from facial photos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a facial photo zone by zone
    Analyze {
        /// Image to analyze
        image: PathBuf,
        /// Face-mesh landmarks as JSON; without them the whole frame is one zone
        #[arg(short, long)]
        landmarks: Option<PathBuf>,
        /// Landmark coordinates are normalized to [0, 1]
        #[arg(long)]
        normalized: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Skip the reference classifier
        #[arg(long)]
        no_reference: bool,
    },
    /// Manage reference categories
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Open config file in editor
    Config,
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// Create an empty category
    Add { name: String },
    /// Add example images to a category (uses <image>.landmarks.json when present)
    Import {
        category: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Landmark coordinates are normalized to [0, 1]
        #[arg(long)]
        normalized: bool,
    },
    /// Show categories and their example counts
    List,
    /// Remove every category and example
    Purge,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Analyze {
            image,
            landmarks,
            normalized,
            json,
            no_reference,
        } => analyze(&cfg, &image, landmarks.as_deref(), normalized, json, no_reference),
        Commands::Library { command } => match command {
            LibraryCommand::Add { name } => add_category(&name),
            LibraryCommand::Import {
                category,
                images,
                normalized,
            } => import(&cfg, &category, &images, normalized),
            LibraryCommand::List => list(),
            LibraryCommand::Purge => purge(),
        },
        Commands::Config => open_config(),
    }
}

/// Where reference vectors come from; fixed for the lifetime of a library.
enum Features {
    Metrics,
    Embedding(Box<dyn EmbeddingModel>),
}

impl Features {
    fn open(cfg: &ReferenceConfig) -> Result<Self> {
        match cfg.features {
            FeatureSource::Metrics => Ok(Features::Metrics),
            FeatureSource::Embedding => Ok(Features::Embedding(load_embedder(cfg)?)),
        }
    }

    fn extract(&mut self, img: &DynamicImage, analysis: &SkinAnalysis) -> Result<FeatureVector> {
        match self {
            Features::Metrics => Ok(vectorize(&analysis.metrics)),
            Features::Embedding(model) => model.embed(img).context("computing embedding"),
        }
    }
}

#[cfg(feature = "onnx")]
fn load_embedder(cfg: &ReferenceConfig) -> Result<Box<dyn EmbeddingModel>> {
    let path = cfg
        .embedding_model
        .as_deref()
        .context("reference.embedding_model is not set")?;
    let model = dermacheck_vision::embedder::OnnxEmbedder::from_file(path, cfg.embedding_input_size)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_embedder(_cfg: &ReferenceConfig) -> Result<Box<dyn EmbeddingModel>> {
    anyhow::bail!("embedding features need a build with the `onnx` feature")
}

/// Decode and analyze one image. `Ok(None)` when landmarks were given but no
/// face was found.
fn analyze_file(
    cfg: &Config,
    path: &Path,
    landmarks: Option<&Path>,
    normalized: bool,
) -> Result<Option<(DynamicImage, SkinAnalysis)>> {
    let img = image::open(path).with_context(|| format!("decoding {}", path.display()))?;

    let analysis = match landmarks {
        Some(file) => {
            let detector = LandmarkFile::new(file).normalized(normalized);
            let mut pipeline = Pipeline::new(Box::new(detector), cfg.max_image_size);
            pipeline.process_image(&img)?
        }
        None => {
            let (scaled, _) = scale_to_fit(&img, cfg.max_image_size);
            Some(analyze_whole_frame(&PixelBuffer::from_image(&scaled)))
        }
    };

    Ok(analysis.map(|analysis| (img, analysis)))
}

fn analyze(
    cfg: &Config,
    image: &Path,
    landmarks: Option<&Path>,
    normalized: bool,
    json: bool,
    no_reference: bool,
) -> Result<()> {
    info!("Analyzing {}", image.display());
    if landmarks.is_none() {
        info!("No landmarks given, analyzing the whole frame");
    }

    let Some((img, analysis)) = analyze_file(cfg, image, landmarks, normalized)? else {
        anyhow::bail!("No face detected. Please ensure the face is visible and well-lit.");
    };

    let reference = if cfg.reference.enabled && !no_reference {
        predict_reference(cfg, &img, &analysis)?
    } else {
        None
    };

    let report = Report::new(analysis, reference);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn predict_reference(
    cfg: &Config,
    img: &DynamicImage,
    analysis: &SkinAnalysis,
) -> Result<Option<Prediction>> {
    let mut library = storage::load_library(None).context("Failed to load reference library")?;
    if library.is_empty() {
        info!("Reference library is empty, skipping reference classification");
        return Ok(None);
    }
    library.rebuild_centroids();

    let mut features = Features::open(&cfg.reference)?;
    let query = features.extract(img, analysis)?;
    if library.dimension() != Some(query.len()) {
        warn!(
            "Library stores {}-value vectors but the query has {}; was it built with other features?",
            library.dimension().unwrap_or(0),
            query.len()
        );
    }

    Ok(cfg.reference.classifier().predict(&library, &query))
}

fn add_category(name: &str) -> Result<()> {
    let mut library = storage::load_library(None).context("Failed to load reference library")?;
    let name = library.add_category(name)?;
    storage::save_library(&library, None).context("Failed to save reference library")?;

    info!("✓ Category \"{}\" created", name);
    Ok(())
}

fn extract_example(
    cfg: &Config,
    features: &mut Features,
    path: &Path,
    normalized: bool,
) -> Result<Option<FeatureVector>> {
    let sibling = path.with_extension("landmarks.json");
    let landmarks = if sibling.exists() {
        Some(sibling.as_path())
    } else {
        None
    };

    match analyze_file(cfg, path, landmarks, normalized)? {
        Some((img, analysis)) => Ok(Some(features.extract(&img, &analysis)?)),
        None => Ok(None),
    }
}

fn import(cfg: &Config, category: &str, images: &[PathBuf], normalized: bool) -> Result<()> {
    let mut library = storage::load_library(None).context("Failed to load reference library")?;
    let mut features = Features::open(&cfg.reference)?;

    info!("Processing {} image(s) for \"{}\"", images.len(), normalize_name(category));

    let mut vectors = Vec::with_capacity(images.len());
    for path in images {
        match extract_example(cfg, &mut features, path, normalized) {
            Ok(Some(vector)) => vectors.push(vector),
            Ok(None) => warn!("{}: no face detected, skipped", path.display()),
            Err(e) => warn!("{}: {:#}, skipped", path.display(), e),
        }
    }

    let added = library.add_examples(category, vectors)?;
    storage::save_library(&library, None).context("Failed to save reference library")?;

    info!("✓ Added {} image(s) to \"{}\"", added, normalize_name(category));
    Ok(())
}

fn list() -> Result<()> {
    let library = storage::load_library(None).context("Failed to load reference library")?;
    let categories = library.list_categories();

    if categories.is_empty() {
        println!("No categories loaded.");
    }
    for (name, count) in categories {
        println!("{}: {} img", name, count);
    }
    Ok(())
}

fn purge() -> Result<()> {
    info!("Purging reference library");

    storage::purge(None).context("Failed to purge reference library")?;

    info!("✓ Reference library purged");
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_path();
    if !config_path.exists() {
        config::save_config(&Config::default(), None).context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
