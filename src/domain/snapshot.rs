use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TeamRecord;

/// The aggregated ranking served to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotFields")]
pub struct Snapshot {
    teams: Vec<TeamRecord>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_week: Option<String>,
}

/// Serialized form; re-sorted on the way in
#[derive(Deserialize)]
struct SnapshotFields {
    teams: Vec<TeamRecord>,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    current_week: Option<String>,
}

impl From<SnapshotFields> for Snapshot {
    fn from(stored: SnapshotFields) -> Self {
        Snapshot::new(stored.teams, stored.last_updated, stored.current_week)
    }
}

impl Snapshot {
    /// Build a snapshot; teams are stable-sorted by projected points, highest first.
    pub fn new(
        mut teams: Vec<TeamRecord>,
        last_updated: DateTime<Utc>,
        current_week: Option<String>,
    ) -> Self {
        teams.sort_by(|a, b| b.projected_points().total_cmp(&a.projected_points()));
        Self {
            teams,
            last_updated,
            current_week,
        }
    }

    pub fn teams(&self) -> &[TeamRecord] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(n: u32, name: &str, projected: f64) -> TeamRecord {
        TeamRecord::new(n, name, projected).unwrap()
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let snapshot = Snapshot::new(
            vec![
                team(1, "Alpha", 101.5),
                team(2, "Bravo", 120.0),
                team(3, "Charlie", 101.5),
                team(4, "Delta", 99.0),
            ],
            Utc::now(),
            None,
        );

        let names: Vec<&str> = snapshot.teams().iter().map(|t| t.team_name()).collect();
        assert_eq!(names, ["Bravo", "Alpha", "Charlie", "Delta"]);
    }

    #[test]
    fn test_json_shape() {
        let snapshot = Snapshot::new(
            vec![team(1, "Alpha", 90.0)],
            Utc::now(),
            Some("Week 7".into()),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["teams"][0]["team_name"], "Alpha");
        assert_eq!(json["current_week"], "Week 7");
        assert!(json["teams"][0].get("current_points").is_none());

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_deserialize_restores_order() {
        let json = r#"{
            "teams": [
                {"team_number": 1, "team_name": "Low", "projected_points": 80.0},
                {"team_number": 2, "team_name": "High", "projected_points": 130.0}
            ],
            "last_updated": "2026-10-19T22:04:00Z"
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = snapshot.teams().iter().map(|t| t.team_name()).collect();
        assert_eq!(names, ["High", "Low"]);
        assert_eq!(snapshot.current_week, None);
    }
}
