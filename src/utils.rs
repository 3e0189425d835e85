use std::{env, path::Path};

use anyhow::{bail, Context};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::info;

use crate::model::ModelArtifacts;

async fn download_file(url: &str, path: &Path) -> anyhow::Result<()> {
    info!("Downloading {} from {}", path.display(), url);

    let mut header_map = HeaderMap::new();

    if let Ok(token) = env::var("GITHUB_TOKEN") {
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Invalid GITHUB_TOKEN format")?;
        header_map.insert(AUTHORIZATION, auth_value);
    }
    header_map.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/octet-stream"),
    );

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .headers(header_map)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        bail!("Failed to download {}: {}", url, response.status());
    }

    let bytes = response.bytes().await.context("Failed to read bytes")?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Fetch `path` from the URL in `url_var` when the file is missing and the
/// variable is set. Returns whether a download happened.
pub async fn fetch_if_missing(path: &Path, url_var: &str) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    match env::var(url_var) {
        Ok(url) => {
            download_file(&url, path).await?;
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

/// Download model artifacts named by `MODEL_URL` / `CLASS_LIST_URL`.
pub async fn ensure_artifacts(artifacts: &ModelArtifacts) -> anyhow::Result<()> {
    info!("Checking model...");
    fetch_if_missing(&artifacts.graph_path, "MODEL_URL").await?;
    fetch_if_missing(&artifacts.class_names_path, "CLASS_LIST_URL").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_file_is_not_fetched() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(!fetch_if_missing(file.path(), "PLANT_TEST_UNSET_URL").await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_without_url_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pb");
        assert!(!fetch_if_missing(&path, "PLANT_TEST_UNSET_URL").await.unwrap());
        assert!(!path.exists());
    }
}
