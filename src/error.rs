use thiserror::Error;

/// Main error type for the rankings service
#[derive(Error, Debug)]
pub enum RankingsError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Redirected to login page while fetching {url}")]
    LoginRedirect { url: String },

    // Extraction errors
    #[error("Parse error for team {team_number}: {reason}")]
    Parse { team_number: u32, reason: String },

    #[error("Invalid selector: {0}")]
    Selector(String),

    // Aggregation errors
    #[error("Incomplete batch: expected {expected} teams, got {got}")]
    IncompleteBatch { expected: usize, got: usize },

    #[error("Refresh already in progress")]
    RefreshInProgress,

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RankingsError {
    /// Whether another attempt at the same request could succeed.
    ///
    /// Login redirects and parse failures are deterministic for a given page.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RankingsError::Http(_) | RankingsError::Status { .. }
        )
    }
}

/// Result type alias for RankingsError
pub type Result<T> = std::result::Result<T, RankingsError>;
