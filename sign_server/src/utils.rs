//! Utility functions
//!
use std::{fs::File, io::Cursor, path::Path};

use reqwest::Client;

use crate::error::InferError;

/// Download a model artifact from a URL to a given filepath.
pub async fn download_file(
    client: &Client,
    url: &str,
    filepath: impl AsRef<Path>,
) -> Result<(), common::Error> {
    let resp = client.get(url).send().await?;

    let mut file = File::create(filepath)?;
    let mut content = Cursor::new(resp.bytes().await?);
    std::io::copy(&mut content, &mut file)?;

    Ok(())
}

/// Fetch missing weights when the caller supplied a URL; otherwise a
/// missing artifact stays fatal.
pub async fn ensure_weights(path: &Path, url: Option<&str>) -> Result<(), InferError> {
    if path.exists() {
        return Ok(());
    }
    let Some(url) = url else {
        return Err(InferError::ModelArtifactMissing(path.to_path_buf()));
    };
    log::info!("Fetching weights from {url} into {}", path.display());
    download_file(&Client::new(), url, path)
        .await
        .map_err(|e| {
            log::error!("Weights download failed: {e}");
            InferError::ModelArtifactMissing(path.to_path_buf())
        })
}
