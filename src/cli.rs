use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repo-harvester")]
#[command(about = "Repo Harvester - Downloads a ZIP archive of every GitHub repository matching a search")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Folder where ZIP archives are stored
    #[arg(long, env = "OUTPUT_DIR", default_value = "./archives")]
    pub output_dir: PathBuf,

    /// Append-only log of processed repositories (defaults to <output-dir>/repositories.txt)
    #[arg(long, env = "OUTPUT_LOG")]
    pub output_log: Option<PathBuf>,

    /// Append-only log of failed downloads (defaults to <output-dir>/error.txt)
    #[arg(long, env = "ERROR_LOG")]
    pub error_log: Option<PathBuf>,

    /// GitHub search endpoint
    #[arg(long, env = "SEARCH_URL", default_value = "https://api.github.com/search/repositories")]
    pub search_url: String,

    /// Language filters
    #[arg(long = "language", env = "LANGUAGES", value_delimiter = ',', default_values = ["C", "cpp"])]
    pub languages: Vec<String>,

    /// Extra search qualifiers, e.g. `user:rsain`
    #[arg(long = "qualifier", env = "EXTRA_QUALIFIERS", value_delimiter = ',')]
    pub qualifiers: Vec<String>,

    /// Items per search page (max 100)
    #[arg(long, env = "PAGE_SIZE", default_value_t = 100)]
    pub page_size: u32,

    /// Seconds to wait between windows and before retries
    #[arg(long, env = "DELAY_SECS", default_value_t = 10)]
    pub delay_secs: u64,

    /// Processed-repository count above which a search failure ends the run instead of restarting it
    #[arg(long, env = "MIN_PROJECTS", default_value_t = 1000)]
    pub min_projects: u64,

    /// Initial star-count upper bound
    #[arg(long, env = "STAR_CEILING", default_value_t = 200_000)]
    pub star_ceiling: u32,

    /// Star count at which the crawl stops
    #[arg(long, env = "STAR_FLOOR", default_value_t = 50)]
    pub star_floor: u32,

    /// Page whose last item sets the next window's upper bound
    #[arg(long, env = "RESET_PAGE", default_value_t = 10)]
    pub reset_page: u32,

    /// Branch whose archive is downloaded
    #[arg(long, env = "ARCHIVE_BRANCH", default_value = "master")]
    pub branch: String,

    /// Full restarts allowed after a retryable failure
    #[arg(long, env = "MAX_RESTARTS", default_value_t = 3)]
    pub max_restarts: u32,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Send the token as an `access_token` query parameter instead of a header
    #[arg(long, env = "TOKEN_IN_QUERY")]
    pub token_in_query: bool,
}
