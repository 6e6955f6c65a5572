use crate::error::Result;
use crate::types::RepoItem;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub fn repository_line(item: &RepoItem) -> String {
    format!("user: {}; repository: {}\n", item.owner_login(), item.name)
}

pub fn failure_line(item: &RepoItem, reason: &str) -> String {
    format!("{}: {}\n", item.full_name, reason)
}

/// Append-only text log. Lines are never rewritten or deduplicated.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: File,
}

impl AppendLog {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, line: &str) -> Result<()> {
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}

/// The repository log plus the failed-download log.
#[derive(Debug)]
pub struct RecordSink {
    repositories: AppendLog,
    failures: AppendLog,
}

impl RecordSink {
    pub async fn open(repositories: impl Into<PathBuf>, failures: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            repositories: AppendLog::open(repositories).await?,
            failures: AppendLog::open(failures).await?,
        })
    }

    pub async fn record_repository(&mut self, item: &RepoItem) -> Result<()> {
        self.repositories.append(&repository_line(item)).await
    }

    pub async fn record_failure(&mut self, item: &RepoItem, reason: &str) -> Result<()> {
        self.failures.append(&failure_line(item, reason)).await
    }
}
