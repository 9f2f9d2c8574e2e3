use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, SourceConfig, SourceMode};
use crate::domain::{Snapshot, TeamRecord};
use crate::error::{RankingsError, Result};
use crate::scrape::{PageSource, TableExtractor, TeamPageExtractor};

/// Runs one fetch → extract → rank pass over the league
pub struct Aggregator {
    source: Arc<dyn PageSource>,
    config: SourceConfig,
    team_extractor: TeamPageExtractor,
    table_extractor: TableExtractor,
    request_delay: Duration,
}

impl Aggregator {
    pub fn new(config: &AppConfig, source: Arc<dyn PageSource>) -> Result<Self> {
        Ok(Self {
            source,
            config: config.source.clone(),
            team_extractor: TeamPageExtractor::new(&config.extract)?,
            table_extractor: TableExtractor::new(&config.extract)?,
            request_delay: config.fetch.request_delay(),
        })
    }

    pub fn expected_teams(&self) -> usize {
        self.config.expected_teams as usize
    }

    /// Run a full cycle. Anything short of the expected team count is an error.
    pub async fn run_cycle(&self) -> Result<Snapshot> {
        let started_at = Utc::now();
        let records = match self.config.mode {
            SourceMode::PerTeam => self.collect_per_team().await?,
            SourceMode::Table => self.collect_table().await?,
        };

        let teams = dedupe_by_name(records);
        if teams.len() != self.expected_teams() {
            return Err(RankingsError::IncompleteBatch {
                expected: self.expected_teams(),
                got: teams.len(),
            });
        }

        let current_week = teams
            .iter()
            .find_map(TeamRecord::week_number)
            .map(|w| format!("Week {w}"));
        let snapshot = Snapshot::new(teams, Utc::now(), current_week);

        if let Some(leader) = snapshot.teams().first() {
            info!(
                "Cycle complete: {} teams in {}s, leader {} ({:.2})",
                snapshot.len(),
                (snapshot.last_updated - started_at).num_seconds(),
                leader.team_name(),
                leader.projected_points()
            );
        }
        Ok(snapshot)
    }

    async fn collect_per_team(&self) -> Result<Vec<TeamRecord>> {
        let mut records = Vec::with_capacity(self.expected_teams());

        for team_number in 1..=self.config.expected_teams {
            if team_number > 1 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let url = self.config.team_url(team_number);
            debug!("Scraping team {} from {}", team_number, url);

            let html = match self.source.fetch_page(&url).await {
                Ok(html) => html,
                // Every other team page will bounce the same way
                Err(e @ RankingsError::LoginRedirect { .. }) => return Err(e),
                Err(e) => {
                    warn!("Failed to fetch team {} ({}): {}", team_number, url, e);
                    continue;
                }
            };

            match self.team_extractor.extract(team_number, &html) {
                Ok(record) => {
                    debug!(
                        "Team {}: {} - {:.2}",
                        team_number,
                        record.team_name(),
                        record.projected_points()
                    );
                    records.push(record);
                }
                Err(e) => warn!("Failed to parse team {} ({}): {}", team_number, url, e),
            }
        }

        Ok(records)
    }

    async fn collect_table(&self) -> Result<Vec<TeamRecord>> {
        let url = self.config.table_url.as_deref().ok_or_else(|| {
            RankingsError::InvalidConfig("source.table_url is not set".to_string())
        })?;
        let html = self.source.fetch_page(url).await?;
        let records = self.table_extractor.extract_all(&html)?;
        debug!("Parsed {} rows from {}", records.len(), url);
        Ok(records)
    }
}

/// Drop later records whose team name was already seen (case-sensitive)
pub fn dedupe_by_name(records: Vec<TeamRecord>) -> Vec<TeamRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.team_name().to_string());
            if !fresh {
                warn!(
                    "Dropping duplicate team name {:?} (team {})",
                    record.team_name(),
                    record.team_number()
                );
            }
            fresh
        })
        .collect()
}
