use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("JSON parsing error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HarvestError {
    /// Network failures and non-2xx responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, HarvestError::Transport(_) | HarvestError::HttpStatus { .. })
    }

    /// Errors a fresh run from the configured ceiling can plausibly get past.
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || matches!(self, HarvestError::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
