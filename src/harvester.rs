use crate::archive::{ArchiveStore, DownloadOutcome};
use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::github::RepositorySource;
use crate::records::RecordSink;
use crate::types::{QueryWindow, RepoItem, SearchPage};
use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// `ceil(total_count / page_size)`; zero matches means zero pages.
pub fn compute_page_count(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size))
}

#[derive(Debug, Clone)]
pub struct DownloadFailure {
    pub item: RepoItem,
    pub reason: String,
}

/// Mutable state of one run, starting from the configured star ceiling.
#[derive(Debug, Clone)]
pub struct HarvestState {
    pub star_upper: u32,
    pub repositories_processed: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub windows: u32,
    pub failures: Vec<DownloadFailure>,
}

impl HarvestState {
    pub fn new(star_upper: u32) -> Self {
        Self {
            star_upper,
            repositories_processed: 0,
            downloaded: 0,
            skipped: 0,
            windows: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReport {
    pub next_star_upper: u32,
    pub repo_count_delta: u64,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    RetryableFailure(HarvestError),
    FatalFailure(HarvestError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Outcome of a supervised run.
///
/// `repositories_processed`, `skipped` and `failures` describe the final
/// attempt, which starts over from the ceiling and so already revisits every
/// earlier item. `downloaded`, `windows` and `processed_across_attempts` are
/// totals over all attempts.
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempts: u32,
    pub windows: u32,
    pub repositories_processed: u64,
    pub processed_across_attempts: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub failures: Vec<DownloadFailure>,
}

impl HarvestSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            attempts: 0,
            windows: 0,
            repositories_processed: 0,
            processed_across_attempts: 0,
            downloaded: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    fn absorb(&mut self, state: HarvestState) {
        self.windows += state.windows;
        self.processed_across_attempts += state.repositories_processed;
        self.downloaded += state.downloaded;
        self.repositories_processed = state.repositories_processed;
        self.skipped = state.skipped;
        self.failures = state.failures;
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug)]
pub struct HarvestReport {
    pub outcome: RunOutcome,
    pub summary: HarvestSummary,
}

pub struct Harvester<S> {
    source: S,
    config: HarvestConfig,
    store: ArchiveStore,
    records: RecordSink,
}

impl<S: RepositorySource> Harvester<S> {
    /// Validates the config, creates the archive folder and opens both logs in append mode.
    pub async fn new(source: S, config: HarvestConfig) -> Result<Self> {
        config.validate()?;

        let store = ArchiveStore::new(&config.output_dir, &config.branch);
        store.prepare().await?;
        let records = RecordSink::open(&config.output_log, &config.error_log).await?;

        Ok(Self {
            source,
            config,
            store,
            records,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs from the configured ceiling, restarting after retryable failures
    /// until `max_restarts` is exhausted. Archives already on disk make every
    /// restart resume where the previous attempt left off.
    pub async fn run_supervised(&mut self) -> HarvestReport {
        let mut summary = HarvestSummary::new(Utc::now());

        let outcome = loop {
            summary.attempts += 1;
            let mut state = HarvestState::new(self.config.star_ceiling);
            let outcome = self.run(&mut state).await;
            summary.absorb(state);

            match outcome {
                RunOutcome::RetryableFailure(e) if summary.attempts <= self.config.max_restarts => {
                    warn!(
                        attempt = summary.attempts,
                        max_restarts = self.config.max_restarts,
                        "Run aborted ({}), restarting from star ceiling {} in {}s",
                        e,
                        self.config.star_ceiling,
                        self.config.delay.as_secs()
                    );
                    sleep(self.config.delay).await;
                }
                RunOutcome::RetryableFailure(e) => {
                    error!(attempts = summary.attempts, "Giving up after repeated failures: {}", e);
                    break RunOutcome::FatalFailure(e);
                }
                other => break other,
            }
        };

        summary.finished_at = Utc::now();
        HarvestReport { outcome, summary }
    }

    /// One pass of the window loop, until the upper bound reaches the floor.
    pub async fn run(&mut self, state: &mut HarvestState) -> RunOutcome {
        let floor = self.config.star_floor;

        while QueryWindow::new(floor, state.star_upper).is_open() {
            match self.run_window(state).await {
                Ok(report) => {
                    state.windows += 1;
                    state.star_upper = report.next_star_upper;
                    info!(
                        processed = report.repo_count_delta,
                        next_star_upper = report.next_star_upper,
                        "Window finished"
                    );

                    if state.star_upper > floor {
                        info!("Sleeping {} seconds before the next query ...", self.config.delay.as_secs());
                        sleep(self.config.delay).await;
                    }
                }
                Err(e) => return self.classify_failure(state, e),
            }
        }

        RunOutcome::Completed
    }

    fn classify_failure(&self, state: &HarvestState, e: HarvestError) -> RunOutcome {
        if !e.is_retryable() {
            error!("Fatal error, aborting run: {}", e);
            return RunOutcome::FatalFailure(e);
        }

        if state.repositories_processed >= self.config.min_projects {
            warn!(
                processed = state.repositories_processed,
                min_projects = self.config.min_projects,
                "Search failed after enough repositories were processed, stopping: {}",
                e
            );
            RunOutcome::Completed
        } else {
            warn!(
                processed = state.repositories_processed,
                "Window aborted: {}",
                e
            );
            RunOutcome::RetryableFailure(e)
        }
    }

    /// Fetches and processes every page of the window `[floor, state.star_upper)`.
    pub async fn run_window(&mut self, state: &mut HarvestState) -> Result<WindowReport> {
        let window = QueryWindow::new(self.config.star_floor, state.star_upper);
        let reset_page = u64::from(self.config.reset_page);
        info!(window = %window.stars_qualifier(), "Processing window");

        let first = self.fetch_with_retry(window, 1).await?;
        let page_count = compute_page_count(first.total_count, self.config.page_size);
        let reachable = page_count.min(self.config.max_reachable_pages());
        info!(total_count = first.total_count, pages = reachable, "Search window sized");

        // Fewer pages than the reset page means this window held every remaining match.
        let mut next_star_upper = if reachable < reset_page {
            self.config.star_floor
        } else {
            state.star_upper
        };
        let mut repo_count_delta = 0;
        let mut pending = Some(first);

        for page in 1..=reachable {
            let result = match pending.take() {
                Some(result) => result,
                None => self.fetch_with_retry(window, page as u32).await?,
            };
            info!("Processing page {} of {} ...", page, reachable);

            for item in &result.items {
                self.process_item(state, item).await?;
                repo_count_delta += 1;
            }

            if page == reset_page {
                if let Some(last) = result.items.last() {
                    next_star_upper = last.stargazers_count;
                }
            }
        }

        if next_star_upper >= state.star_upper {
            warn!(
                star_upper = state.star_upper,
                "Reset page yielded no smaller star count, narrowing window by one"
            );
            next_star_upper = state.star_upper.saturating_sub(1);
        }

        Ok(WindowReport {
            next_star_upper,
            repo_count_delta,
        })
    }

    async fn fetch_with_retry(&self, window: QueryWindow, page: u32) -> Result<SearchPage> {
        match self.source.fetch_page(window, page).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_transport() => {
                warn!(page, "Search request failed ({}), retrying in {}s", e, self.config.delay.as_secs());
                sleep(self.config.delay).await;
                self.source.fetch_page(window, page).await
            }
            Err(e) => Err(e),
        }
    }

    async fn process_item(&mut self, state: &mut HarvestState, item: &RepoItem) -> Result<()> {
        debug!(
            user = %item.owner_login(),
            repository = %item.name,
            stars = item.stargazers_count,
            "Processing repository"
        );

        match self.store.download_if_absent(&self.source, item).await? {
            DownloadOutcome::Downloaded { bytes } => {
                self.records.record_repository(item).await?;
                state.downloaded += 1;
                info!(repo = %item.full_name, bytes, "Archive saved");
            }
            DownloadOutcome::Skipped => {
                state.skipped += 1;
            }
            DownloadOutcome::Failed { reason } => {
                self.records.record_failure(item, &reason).await?;
                state.failures.push(DownloadFailure {
                    item: item.clone(),
                    reason,
                });
            }
        }

        state.repositories_processed += 1;
        Ok(())
    }
}
