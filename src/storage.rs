use crate::config::DATA_DIR;
use anyhow::{Context, Result};
use dermacheck_vision::Library;
use std::path::{Path, PathBuf};

const LIBRARY_FILE: &str = "library.bin";

fn library_path(dir: Option<&Path>) -> PathBuf {
    dir.unwrap_or(&DATA_DIR).join(LIBRARY_FILE)
}

/// Load the reference library, or an empty one if none was saved yet.
pub fn load_library(dir: Option<&Path>) -> Result<Library> {
    let file = library_path(dir);

    if !file.exists() {
        return Ok(Library::new());
    }

    let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
}

/// Centroid caches are not written; they are rebuilt after loading.
pub fn save_library(library: &Library, dir: Option<&Path>) -> Result<()> {
    let file = library_path(dir);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = postcard::to_allocvec(library)?;
    std::fs::write(&file, data).with_context(|| format!("writing {}", file.display()))?;
    Ok(())
}

pub fn purge(dir: Option<&Path>) -> Result<()> {
    let file = library_path(dir);
    if file.exists() {
        std::fs::remove_file(&file).with_context(|| format!("removing {}", file.display()))?;
    }
    Ok(())
}
