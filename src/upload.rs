//! Upload validation and storage.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PredictError;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Case-insensitive check of the text after the last `.`.
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Reduce a client-supplied name to a safe basename: ASCII letters, digits,
/// `.`, `_` and `-` only, whitespace becomes `_`, no leading or trailing
/// `.`/`_`.
pub fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_whitespace() {
            out.push('_');
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        }
    }

    out.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// `<unix_seconds>_<secure name>`.
pub fn stored_name(timestamp: u64, original: &str) -> String {
    let safe = secure_filename(original);
    let safe = if safe.is_empty() { "upload".to_string() } else { safe };
    format!("{}_{}", timestamp, safe)
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Check a multipart filename before anything is written.
pub fn validate(filename: Option<&str>) -> Result<&str, PredictError> {
    match filename {
        None => Err(PredictError::Validation("No file uploaded".into())),
        Some("") => Err(PredictError::Validation("No file selected".into())),
        Some(name) if !allowed_file(name) => {
            Err(PredictError::Validation("Invalid file type".into()))
        }
        Some(name) => Ok(name),
    }
}

/// A file written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub filename: String,
}

/// Write `bytes` under `dir`. Same-second uploads of the same name overwrite
/// each other.
pub async fn save(dir: &Path, original: &str, bytes: &[u8]) -> std::io::Result<StoredUpload> {
    let filename = stored_name(unix_timestamp(), original);
    let path = dir.join(&filename);
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, bytes).await?;
    Ok(StoredUpload { path, filename })
}
