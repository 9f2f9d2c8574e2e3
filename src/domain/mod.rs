pub mod snapshot;
pub mod team;

pub use snapshot::Snapshot;
pub use team::{clean_team_name, progress_pct, TeamRecord};
