use crate::error::Result;
use crate::github::RepositorySource;
use crate::types::RepoItem;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `owner/repo` becomes `owner#repo.zip`.
pub fn archive_file_name(full_name: &str) -> String {
    format!("{}.zip", full_name.replace('/', "#"))
}

/// `https://host/owner/repo.git` becomes `https://host/owner/repo/archive/<branch>.zip`.
pub fn archive_download_url(clone_url: &str, branch: &str) -> String {
    let base = clone_url.strip_suffix(".git").unwrap_or(clone_url);
    format!("{}/archive/{}.zip", base.trim_end_matches('/'), branch)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { bytes: u64 },
    Skipped,
    Failed { reason: String },
}

/// Archive directory on disk. A file's presence is the only record that a
/// repository has already been harvested.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    output_dir: PathBuf,
    branch: String,
}

impl ArchiveStore {
    pub fn new(output_dir: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            branch: branch.into(),
        }
    }

    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    pub fn archive_path(&self, item: &RepoItem) -> PathBuf {
        self.output_dir.join(archive_file_name(&item.full_name))
    }

    pub fn download_url(&self, item: &RepoItem) -> String {
        archive_download_url(&item.clone_url, &self.branch)
    }

    /// Download the item's archive unless a file with its name already exists.
    ///
    /// Transport failures become [`DownloadOutcome::Failed`]; filesystem
    /// failures are returned as errors since they affect every later item too.
    pub async fn download_if_absent<S>(&self, source: &S, item: &RepoItem) -> Result<DownloadOutcome>
    where
        S: RepositorySource + ?Sized,
    {
        let target = self.archive_path(item);
        if tokio::fs::try_exists(&target).await? {
            debug!(repo = %item.full_name, path = %target.display(), "Archive already present, skipping");
            return Ok(DownloadOutcome::Skipped);
        }

        let url = self.download_url(item);
        let partial = partial_path(&target);
        info!(repo = %item.full_name, %url, "Downloading archive");

        match source.download_archive(&url, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, &target).await?;
                Ok(DownloadOutcome::Downloaded { bytes })
            }
            Err(e) if e.is_transport() => {
                discard(&partial).await;
                warn!(repo = %item.full_name, %url, "Archive download failed: {}", e);
                Ok(DownloadOutcome::Failed { reason: e.to_string() })
            }
            Err(e) => {
                discard(&partial).await;
                Err(e)
            }
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove partial archive: {}", e);
        }
    }
}
