use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scrape::PointsStrategy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How team data is laid out on the source site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// One page per team, fetched as `{base_url}{team_number}`
    #[default]
    PerTeam,
    /// One league table page listing every team
    Table,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,
    /// Per-team page prefix; the team number is appended
    pub base_url: String,
    /// League table page (table mode only)
    pub table_url: Option<String>,
    /// Number of teams a complete cycle must yield
    pub expected_teams: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::PerTeam,
            base_url: "https://football.fantasysports.yahoo.com/f1/723352/".to_string(),
            table_url: None,
            expected_teams: 16,
        }
    }
}

impl SourceConfig {
    pub fn team_url(&self, team_number: u32) -> String {
        format!("{}{}", self.base_url, team_number)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub backoff_ms: u64,
    /// Delay between consecutive team requests in milliseconds
    pub request_delay_ms: u64,
    pub user_agent: String,
    /// Substrings of a final URL that mean we were bounced to a sign-in page
    pub login_markers: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 3,
            backoff_ms: 1000,
            request_delay_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            login_markers: vec![
                "login.".to_string(),
                "/login".to_string(),
                "/signin".to_string(),
            ],
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Where a numeric field lives on a team page
#[derive(Debug, Clone, Deserialize)]
pub struct PointsRule {
    /// Visible label next to the value (e.g. "Proj Points")
    pub label: String,
    /// Element whose text contains the label
    pub container_selector: String,
    /// Element inside the container holding the number
    pub value_selector: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableRules {
    pub table_selector: String,
    /// Header cell text identifying the team-name column (and the table itself)
    pub name_header: String,
    pub projected_header: String,
    pub current_header: Option<String>,
}

impl Default for TableRules {
    fn default() -> Self {
        Self {
            table_selector: "table".to_string(),
            name_header: "Team".to_string(),
            projected_header: "Proj".to_string(),
            current_header: Some("Pts".to_string()),
        }
    }
}

/// Selector rules for the extractor. The source markup drifts, so none of this is hardcoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub team_name_selectors: Vec<String>,
    pub projected: PointsRule,
    pub current: Option<PointsRule>,
    /// Order in which points strategies are tried
    pub strategies: Vec<PointsStrategy>,
    /// Class prefix on the points container that carries a highlight color
    pub highlight_class_prefix: String,
    pub week_selectors: Vec<String>,
    pub table: TableRules,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            team_name_selectors: vec![
                "span.team-name".to_string(),
                "a.team-name".to_string(),
                ".Navtarget .team-name".to_string(),
            ],
            projected: PointsRule {
                label: "Proj Points".to_string(),
                container_selector: "div.team-card-stats".to_string(),
                value_selector: "span.Fw-b".to_string(),
            },
            current: Some(PointsRule {
                label: "Pts".to_string(),
                container_selector: "div.team-card-score".to_string(),
                value_selector: "span.Fw-b".to_string(),
            }),
            strategies: PointsStrategy::DEFAULT_ORDER.to_vec(),
            highlight_class_prefix: "F-".to_string(),
            week_selectors: vec!["span.flyout-title".to_string(), ".Week-label".to_string()],
            table: TableRules::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for the on-disk store, relative to the working directory
    pub dir: PathBuf,
    pub ttl_secs: u64,
    /// Fraction of the TTL after which a read schedules a background refresh
    pub refresh_threshold: f64,
    /// Keep snapshots on disk (false = in-memory only)
    pub persist: bool,
    /// Flat JSON copy of the latest snapshot, used when the store is empty at startup
    pub fallback_file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cache"),
            ttl_secs: 3600,
            refresh_threshold: 0.8,
            persist: true,
            fallback_file: "latest_snapshot.json".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.dir.join(&self.fallback_file)
    }
}

/// A weekly day/time range, in the schedule timezone
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameWindowConfig {
    /// Weekday name ("thu", "Sunday", ...)
    pub day: String,
    /// Start time, "HH:MM"
    pub start: String,
    /// End time (inclusive), "HH:MM"
    pub end: String,
}

impl GameWindowConfig {
    fn new(day: &str, start: &str, end: &str) -> Self {
        Self {
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone the game windows are expressed in
    pub timezone: String,
    pub game_window_interval_secs: u64,
    pub idle_interval_secs: u64,
    pub windows: Vec<GameWindowConfig>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            game_window_interval_secs: 300,
            idle_interval_secs: 3600,
            windows: vec![
                GameWindowConfig::new("thu", "20:00", "23:59"),
                GameWindowConfig::new("sun", "13:00", "23:59"),
                GameWindowConfig::new("mon", "20:00", "23:59"),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    /// IANA timezone for the "last updated" line
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: "Fantasy Football Projected Points Rankings".to_string(),
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
    /// Directory for rolling log files; console only when unset
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|e| format!("unknown timezone {name:?}: {e}"))
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        // Hosting platforms hand us the listen port as plain PORT
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .map(i64::from);

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("server.port", 5000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("RANKINGS_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (RANKINGS__CACHE__TTL_SECS, etc.)
            .add_source(
                Environment::with_prefix("RANKINGS")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port)?;

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.source.expected_teams == 0 {
            errors.push("source.expected_teams must be at least 1".to_string());
        }

        match self.source.mode {
            SourceMode::PerTeam => {
                if self.source.base_url.trim().is_empty() {
                    errors.push("source.base_url is required in per_team mode".to_string());
                }
            }
            SourceMode::Table => {
                if self.source.table_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    errors.push("source.table_url is required in table mode".to_string());
                }
            }
        }

        if self.fetch.max_attempts == 0 {
            errors.push("fetch.max_attempts must be at least 1".to_string());
        }

        if !(5..=10).contains(&self.fetch.timeout_secs) {
            errors.push("fetch.timeout_secs must be between 5 and 10".to_string());
        }

        if self.extract.team_name_selectors.is_empty() {
            errors.push("extract.team_name_selectors must not be empty".to_string());
        }

        if self.cache.ttl_secs == 0 {
            errors.push("cache.ttl_secs must be positive".to_string());
        }

        if !(self.cache.refresh_threshold > 0.0 && self.cache.refresh_threshold <= 1.0) {
            errors.push("cache.refresh_threshold must be in (0, 1]".to_string());
        }

        if self.schedule.game_window_interval_secs == 0 || self.schedule.idle_interval_secs == 0 {
            errors.push("schedule intervals must be positive".to_string());
        }

        for tz in [&self.schedule.timezone, &self.display.timezone] {
            if let Err(e) = parse_timezone(tz) {
                errors.push(e);
            }
        }

        if let Err(e) = crate::services::scheduler::GameWindow::parse_all(&self.schedule.windows) {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
