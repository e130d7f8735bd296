//! Directory uploader: pushes every Parquet file of a local folder

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{ObjectStore, UploadResult};

/// Extension of the files picked up for upload
pub const PARQUET_EXTENSION: &str = ".parquet";

/// Remote key for a file: `{folder}/{filename}`
pub fn remote_key(folder: &str, filename: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder, filename)
    }
}

/// Regular files directly under `dir` whose name ends in `.parquet`.
///
/// Subdirectories are not descended into. Results are sorted by name.
pub fn list_parquet_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Error reading directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.ends_with(PARQUET_EXTENSION) {
            files.push((filename, entry.path()));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Uploads every Parquet file in `local_dir` to `{folder}/{filename}`.
///
/// Puts are unconditional. The first failure stops the upload.
pub async fn upload_directory<O: ObjectStore + ?Sized>(
    store: &O,
    folder: &str,
    local_dir: &Path,
) -> Result<Vec<UploadResult>> {
    let files = list_parquet_files(local_dir)?;

    if files.is_empty() {
        tracing::warn!("No parquet files found in {}", local_dir.display());
        return Ok(Vec::new());
    }

    let mut uploaded = Vec::with_capacity(files.len());
    for (filename, path) in files {
        let key = remote_key(folder, &filename);
        let result = store
            .put_file(&path, &key)
            .await
            .with_context(|| format!("Error uploading {}", path.display()))?;
        uploaded.push(result);
    }

    Ok(uploaded)
}
