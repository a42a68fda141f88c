use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Locate an ONNX model by file name, fetching it on first use.
///
/// Checked in order: the per-user cache, then an optional bundled
/// directory (development and packaged installs), then a download into
/// the cache.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached = cache_dir.join(name);
    if cached.exists() {
        return Ok(cached);
    }

    if let Some(bundled) = bundled_dir.map(|d| d.join(name)) {
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading model {name} from {url}");
    fetch_into(url, &cached)?;
    Ok(cached)
}

/// Per-user model cache: `<data dir>/Clipveil/models` on macOS,
/// `<cache dir>/Clipveil/models` elsewhere.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    let base = if cfg!(target_os = "macos") {
        dirs::data_dir()
    } else {
        dirs::cache_dir()
    };
    base.map(|d| d.join("Clipveil").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Download to `<dest>.part`, then rename, so a failed transfer never
/// leaves a truncated model behind.
fn fetch_into(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let bytes = reqwest::blocking::get(url)
        .map_err(download_err)?
        .bytes()
        .map_err(download_err)?;

    let partial = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: partial.clone(),
        source,
    };
    let mut file = fs::File::create(&partial).map_err(write_err)?;
    file.write_all(&bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&partial, dest).map_err(|source| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source,
    })
}
