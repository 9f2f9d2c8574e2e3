use clap::{Parser, Subcommand};

use crate::domain::Snapshot;

#[derive(Parser)]
#[command(name = "fantasy-rankings")]
#[command(version = "0.1.0")]
#[command(
    about = "Scrapes fantasy football projections and serves a ranked table",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml and per-environment overrides)
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the web server with the background refresher (default)
    Serve {
        /// Listen port (overrides PORT and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a single refresh cycle and print the ranking
    Refresh,
}

/// Plain-text ranking for the terminal
pub fn format_rankings(snapshot: &Snapshot) -> String {
    let width = snapshot
        .teams()
        .iter()
        .map(|t| t.team_name().len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = String::new();
    if let Some(week) = &snapshot.current_week {
        out.push_str(&format!("{week}\n"));
    }
    out.push_str(&format!("{:>4}  {:<width$}  {:>9}\n", "#", "Team", "Projected"));
    for (idx, team) in snapshot.teams().iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>9.2}\n",
            idx + 1,
            team.team_name(),
            team.projected_points()
        ));
    }
    out
}
