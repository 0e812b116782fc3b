use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::{report::window::DayWindow, utils::time::date_to_report_name};

/// Daily documents on disk, one file per date.
pub struct ReportStore {
    output_dir: PathBuf,
}

impl ReportStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("{}-daily-summary.md", date_to_report_name(date)))
    }

    /// Writes the document of `window`, replacing the one of a previous run.
    pub async fn write(&self, window: &DayWindow, document: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;
        let path = self.path_for(window.date());
        tokio::fs::write(&path, document)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Report written to {path:?}");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::report::window::DayWindow;

    use super::ReportStore;

    #[tokio::test]
    async fn test_write_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let store = ReportStore::new(dir.path().join("nested/summaries"));
        let window = DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap())?;

        let first = store.write(&window, "# 02/10 Daily Summary\n").await?;
        let first_content = std::fs::read(&first)?;
        let second = store.write(&window, "# 02/10 Daily Summary\n").await?;

        assert_eq!(first, second);
        assert!(first.ends_with("2026-02-10-daily-summary.md"));
        assert_eq!(first_content, std::fs::read(&second)?);
        assert_eq!(std::fs::read_dir(store.output_dir())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let store = ReportStore::new(dir.path().to_path_buf());
        let window = DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap())?;
        store.write(&window, "a much longer first version\n").await?;
        let path = store.write(&window, "short\n").await?;
        assert_eq!(std::fs::read_to_string(path)?, "short\n");
        Ok(())
    }
}
