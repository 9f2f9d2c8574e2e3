//! Fetching and parsing of the source site's pages.

pub mod extract;
pub mod fetcher;
pub mod retry;
pub mod table;

pub use extract::{parse_points, parse_week, PointsStrategy, TeamPageExtractor};
pub use fetcher::{is_login_url, HttpFetcher, PageSource};
pub use retry::RetryPolicy;
pub use table::TableExtractor;

#[cfg(test)]
pub use fetcher::MockPageSource;
