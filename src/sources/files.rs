use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use walkdir::WalkDir;

/// Fails with a readable message when a source's directory or file is missing.
pub fn require_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    Ok(())
}

pub async fn modified_at(path: &Path) -> Result<DateTime<Local>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(DateTime::<Local>::from(metadata.modified()?))
}

/// Reads non-empty lines of a text file.
pub async fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut values = vec![];
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            values.push(line);
        }
    }
    Ok(values)
}

/// Recursively lists files under `root` with the given extension, sorted by path.
pub fn find_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(|v| v.ok())
        .filter(|v| v.file_type().is_file())
        .map(|v| v.into_path())
        .filter(|v| v.extension().is_some_and(|ext| ext == extension))
        .collect::<Vec<_>>();
    files.sort();
    files
}
