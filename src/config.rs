use crate::cli::Cli;
use crate::error::{HarvestError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SEARCH_URL: &str = "https://api.github.com/search/repositories";
pub const MAX_PAGE_SIZE: u32 = 100;
/// GitHub never returns more than this many results for one search.
pub const SEARCH_RESULT_CAP: u64 = 1000;

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub output_log: PathBuf,
    pub error_log: PathBuf,
    pub search_url: String,
    pub languages: Vec<String>,
    pub qualifiers: Vec<String>,
    pub page_size: u32,
    pub delay: Duration,
    pub min_projects: u64,
    pub star_ceiling: u32,
    pub star_floor: u32,
    pub reset_page: u32,
    pub branch: String,
    pub max_restarts: u32,
    pub token: Option<String>,
    pub token_in_query: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let output_dir = PathBuf::from("./archives");
        Self {
            output_log: output_dir.join("repositories.txt"),
            error_log: output_dir.join("error.txt"),
            output_dir,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            languages: vec!["C".to_string(), "cpp".to_string()],
            qualifiers: Vec::new(),
            page_size: 100,
            delay: Duration::from_secs(10),
            min_projects: 1000,
            star_ceiling: 200_000,
            star_floor: 50,
            reset_page: 10,
            branch: "master".to_string(),
            max_restarts: 3,
            token: None,
            token_in_query: false,
        }
    }
}

impl HarvestConfig {
    /// Config rooted at `output_dir`, with both logs placed inside it.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            output_log: output_dir.join("repositories.txt"),
            error_log: output_dir.join("error.txt"),
            output_dir,
            ..Default::default()
        }
    }

    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let output_dir = cli.output_dir.clone();
        let config = Self {
            output_log: cli
                .output_log
                .clone()
                .unwrap_or_else(|| output_dir.join("repositories.txt")),
            error_log: cli
                .error_log
                .clone()
                .unwrap_or_else(|| output_dir.join("error.txt")),
            output_dir,
            search_url: cli.search_url.clone(),
            languages: non_empty(&cli.languages),
            qualifiers: non_empty(&cli.qualifiers),
            page_size: cli.page_size,
            delay: Duration::from_secs(cli.delay_secs),
            min_projects: cli.min_projects,
            star_ceiling: cli.star_ceiling,
            star_floor: cli.star_floor,
            reset_page: cli.reset_page,
            branch: cli.branch.trim().to_string(),
            max_restarts: cli.max_restarts,
            token: cli.github_token.clone().filter(|t| !t.trim().is_empty()),
            token_in_query: cli.token_in_query,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(HarvestError::Config(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.star_ceiling <= self.star_floor {
            return Err(HarvestError::Config(format!(
                "star ceiling ({}) must be above the star floor ({})",
                self.star_ceiling, self.star_floor
            )));
        }
        if self.reset_page == 0 {
            return Err(HarvestError::Config("reset page must be at least 1".to_string()));
        }
        if u64::from(self.reset_page) > self.max_reachable_pages() {
            return Err(HarvestError::Config(format!(
                "reset page {} is beyond the last reachable search page ({})",
                self.reset_page,
                self.max_reachable_pages()
            )));
        }
        if self.branch.is_empty() {
            return Err(HarvestError::Config("archive branch must not be empty".to_string()));
        }
        Ok(())
    }

    /// Highest page number the search API will actually serve.
    pub fn max_reachable_pages(&self) -> u64 {
        crate::harvester::compute_page_count(SEARCH_RESULT_CAP, self.page_size)
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
