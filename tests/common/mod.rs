#![allow(dead_code)]

use async_trait::async_trait;
use repo_harvester::config::HarvestConfig;
use repo_harvester::error::{HarvestError, Result};
use repo_harvester::github::RepositorySource;
use repo_harvester::types::{QueryWindow, RepoItem, RepoOwner, SearchPage};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ARCHIVE_BYTES: &[u8] = b"PK\x03\x04fake archive";

pub fn repo(owner: &str, name: &str, stars: u32) -> RepoItem {
    RepoItem {
        owner: RepoOwner {
            login: owner.to_string(),
        },
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        stargazers_count: stars,
        clone_url: format!("https://github.com/{}/{}.git", owner, name),
    }
}

/// `count` repositories owned by `owner` with distinct star counts `base..base+count`.
pub fn repos_with_stars(owner: &str, base: u32, count: u32) -> Vec<RepoItem> {
    (0..count)
        .map(|i| repo(owner, &format!("repo{}", i), base + i))
        .collect()
}

/// Test config writing into a fresh temporary directory, with no delays.
pub fn test_config() -> (TempDir, HarvestConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = HarvestConfig::with_output_dir(dir.path().join("archives"));
    config.delay = Duration::ZERO;
    config.max_restarts = 0;
    (dir, config)
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// In-memory stand-in for the GitHub search API. Results are sorted by stars
/// descending and capped at 1000 per search, like the real endpoint.
pub struct FakeSource {
    repos: Vec<RepoItem>,
    page_size: u32,
    failing_downloads: HashSet<String>,
    fail_first_searches: Mutex<usize>,
    fail_searches_from_call: Option<usize>,
    failing_search_calls: HashSet<usize>,
    search_calls: Mutex<Vec<(QueryWindow, u32)>>,
    download_calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new(mut repos: Vec<RepoItem>, page_size: u32) -> Self {
        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
        Self {
            repos,
            page_size,
            failing_downloads: HashSet::new(),
            fail_first_searches: Mutex::new(0),
            fail_searches_from_call: None,
            failing_search_calls: HashSet::new(),
            search_calls: Mutex::new(Vec::new()),
            download_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_download(mut self, full_name: &str) -> Self {
        self.failing_downloads.insert(full_name.to_string());
        self
    }

    /// The first `count` search requests fail with a 503.
    pub fn failing_first_searches(self, count: usize) -> Self {
        *self.fail_first_searches.lock().unwrap() = count;
        self
    }

    /// Every search request from the zero-based call index `call` onwards fails.
    pub fn failing_searches_from(mut self, call: usize) -> Self {
        self.fail_searches_from_call = Some(call);
        self
    }

    /// Only the search requests with these zero-based call indices fail.
    pub fn failing_search_calls(mut self, calls: &[usize]) -> Self {
        self.failing_search_calls.extend(calls.iter().copied());
        self
    }

    pub fn search_calls(&self) -> Vec<(QueryWindow, u32)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }

    fn unavailable(what: &str) -> HarvestError {
        HarvestError::HttpStatus {
            status: 503,
            url: what.to_string(),
        }
    }
}

#[async_trait]
impl RepositorySource for FakeSource {
    async fn fetch_page(&self, window: QueryWindow, page: u32) -> Result<SearchPage> {
        let call = {
            let mut calls = self.search_calls.lock().unwrap();
            calls.push((window, page));
            calls.len() - 1
        };

        {
            let mut remaining = self.fail_first_searches.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Self::unavailable("search"));
            }
        }
        if self.fail_searches_from_call.is_some_and(|from| call >= from)
            || self.failing_search_calls.contains(&call)
        {
            return Err(Self::unavailable("search"));
        }

        let matching: Vec<&RepoItem> = self
            .repos
            .iter()
            .filter(|r| r.stargazers_count >= window.lower_stars && r.stargazers_count < window.upper_stars)
            .collect();

        let start = (page as usize - 1) * self.page_size as usize;
        if start >= 1000 {
            return Err(HarvestError::HttpStatus {
                status: 422,
                url: format!("search page {}", page),
            });
        }

        let items = matching
            .iter()
            .skip(start)
            .take(self.page_size as usize)
            .map(|r| (*r).clone())
            .collect();

        Ok(SearchPage {
            total_count: matching.len() as u64,
            items,
        })
    }

    async fn download_archive(&self, url: &str, dest: &Path) -> Result<u64> {
        self.download_calls.lock().unwrap().push(url.to_string());

        let failing = self
            .failing_downloads
            .iter()
            .any(|full_name| url.contains(&format!("/{}/archive/", full_name)));
        if failing {
            return Err(HarvestError::HttpStatus {
                status: 404,
                url: url.to_string(),
            });
        }

        tokio::fs::write(dest, ARCHIVE_BYTES).await?;
        Ok(ARCHIVE_BYTES.len() as u64)
    }
}

/// Serves exactly one HTTP response on a local port. The handle resolves to
/// the raw request head the client sent.
pub async fn serve_once(status: &str, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let status = status.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("Failed to accept");

        let mut head: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("Failed to read request");
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }

        let response_head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        socket.write_all(response_head.as_bytes()).await.expect("Failed to write head");
        socket.write_all(&body).await.expect("Failed to write body");
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&head).into_owned()
    });

    (base_url, handle)
}

/// A local URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
