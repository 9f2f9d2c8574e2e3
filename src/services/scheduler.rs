//! Background refresh loop with an adaptive interval.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::refresher::Refresher;
use crate::config::{parse_timezone, GameWindowConfig, ScheduleConfig};
use crate::domain::Snapshot;
use crate::error::{RankingsError, Result};

/// A weekly range during which games are on and scores move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameWindow {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl GameWindow {
    pub fn parse(config: &GameWindowConfig) -> Result<Self> {
        let day = config.day.parse::<Weekday>().map_err(|_| {
            RankingsError::InvalidConfig(format!("unknown weekday {:?}", config.day))
        })?;
        let time = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
                RankingsError::InvalidConfig(format!("bad time {s:?}, expected HH:MM"))
            })
        };
        let (start, end) = (time(&config.start)?, time(&config.end)?);
        if start > end {
            return Err(RankingsError::InvalidConfig(format!(
                "game window on {} starts after it ends",
                config.day
            )));
        }
        Ok(Self { day, start, end })
    }

    pub fn parse_all(configs: &[GameWindowConfig]) -> Result<Vec<Self>> {
        configs.iter().map(Self::parse).collect()
    }

    /// Minute-resolution check; the end minute is included
    pub fn contains(&self, day: Weekday, time: NaiveTime) -> bool {
        let minute = (time.hour(), time.minute());
        day == self.day
            && (self.start.hour(), self.start.minute()) <= minute
            && minute <= (self.end.hour(), self.end.minute())
    }
}

/// Decides how long to sleep between cycles
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    tz: Tz,
    windows: Vec<GameWindow>,
    game_interval: Duration,
    idle_interval: Duration,
}

impl RefreshSchedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Ok(Self {
            tz: parse_timezone(&config.timezone).map_err(RankingsError::InvalidConfig)?,
            windows: GameWindow::parse_all(&config.windows)?,
            game_interval: Duration::from_secs(config.game_window_interval_secs),
            idle_interval: Duration::from_secs(config.idle_interval_secs),
        })
    }

    pub fn in_game_window(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        let (day, time) = (local.weekday(), local.time());
        self.windows.iter().any(|w| w.contains(day, time))
    }

    pub fn interval_at(&self, now: DateTime<Utc>) -> Duration {
        if self.in_game_window(now) {
            self.game_interval
        } else {
            self.idle_interval
        }
    }
}

/// Owns the refresh loop
pub struct Scheduler {
    refresher: Arc<Refresher>,
    schedule: RefreshSchedule,
}

/// Handle to a spawned scheduler.
///
/// Dropping it detaches the loop, which then runs until the runtime shuts down.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for it to exit. A cycle in flight runs to completion first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }
}

impl Scheduler {
    pub fn new(refresher: Arc<Refresher>, schedule: RefreshSchedule) -> Self {
        Self {
            refresher,
            schedule,
        }
    }

    /// Run exactly one cycle
    pub async fn run_once(&self) -> Result<Snapshot> {
        self.refresher.refresh().await
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        SchedulerHandle { stop_tx, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        info!("Scheduler started");
        loop {
            match self.run_once().await {
                Ok(snapshot) => debug!("Scheduled refresh published {} teams", snapshot.len()),
                Err(RankingsError::RefreshInProgress) => {
                    debug!("Skipping scheduled refresh; one is already running")
                }
                Err(e) => error!("Scheduled refresh failed: {}", e),
            }

            let wait = self.schedule.interval_at(Utc::now());
            info!("Next refresh in {}s", wait.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = stop_requested(&mut stop) => break,
            }
        }
        info!("Scheduler stopped");
    }
}

/// Resolves once `true` is sent. Never resolves after the handle is dropped.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            debug!("Scheduler handle dropped; loop continues detached");
            std::future::pending::<()>().await;
        }
    }
}
