use serde::{Deserialize, Serialize};

use crate::error::{RankingsError, Result};

/// Strip everything except ASCII letters, digits and spaces, then trim.
///
/// `"Team #1 (Champs!)"` becomes `"Team 1 Champs"`.
pub fn clean_team_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Share of the projection already scored, capped at 100.
pub fn progress_pct(current: f64, projected: f64) -> Option<f64> {
    if projected > 0.0 && current.is_finite() {
        Some((current / projected * 100.0).clamp(0.0, 100.0))
    } else {
        None
    }
}

/// One team's extracted metrics for a single cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TeamRecordFields")]
pub struct TeamRecord {
    team_number: u32,
    team_name: String,
    projected_points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    week_number: Option<u32>,
}

/// Serialized form; records read back from disk go through [`TeamRecord::new`]
#[derive(Deserialize)]
struct TeamRecordFields {
    team_number: u32,
    team_name: String,
    projected_points: f64,
    #[serde(default)]
    current_points: Option<f64>,
    #[serde(default)]
    color_class: Option<String>,
    #[serde(default)]
    week_number: Option<u32>,
}

impl TryFrom<TeamRecordFields> for TeamRecord {
    type Error = RankingsError;

    fn try_from(stored: TeamRecordFields) -> Result<Self> {
        Ok(
            TeamRecord::new(stored.team_number, &stored.team_name, stored.projected_points)?
                .with_current_points(stored.current_points)
                .with_color_class(stored.color_class)
                .with_week_number(stored.week_number),
        )
    }
}

impl TeamRecord {
    /// Build a record from raw scraped values. The name is cleaned here.
    pub fn new(team_number: u32, raw_name: &str, projected_points: f64) -> Result<Self> {
        let team_name = clean_team_name(raw_name);
        if team_name.is_empty() {
            return Err(RankingsError::Parse {
                team_number,
                reason: format!("team name {raw_name:?} is empty after cleaning"),
            });
        }
        if !projected_points.is_finite() || projected_points < 0.0 {
            return Err(RankingsError::Parse {
                team_number,
                reason: format!("projected points {projected_points} out of range"),
            });
        }
        Ok(Self {
            team_number,
            team_name,
            projected_points,
            current_points: None,
            color_class: None,
            week_number: None,
        })
    }

    pub fn with_current_points(mut self, points: Option<f64>) -> Self {
        self.current_points = points.filter(|p| p.is_finite());
        self
    }

    pub fn with_color_class(mut self, class: Option<String>) -> Self {
        self.color_class = class.filter(|c| !c.is_empty());
        self
    }

    pub fn with_week_number(mut self, week: Option<u32>) -> Self {
        self.week_number = week;
        self
    }

    pub fn team_number(&self) -> u32 {
        self.team_number
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn projected_points(&self) -> f64 {
        self.projected_points
    }

    pub fn current_points(&self) -> Option<f64> {
        self.current_points
    }

    pub fn color_class(&self) -> Option<&str> {
        self.color_class.as_deref()
    }

    pub fn week_number(&self) -> Option<u32> {
        self.week_number
    }

    pub fn progress_pct(&self) -> Option<f64> {
        progress_pct(self.current_points?, self.projected_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_team_name() {
        assert_eq!(clean_team_name("Team #1 (Champs!)"), "Team 1 Champs");
        assert_eq!(clean_team_name("  Gridiron Gurus  "), "Gridiron Gurus");
        assert_eq!(clean_team_name("Señor 🏈 Touchdown"), "Seor  Touchdown");
        assert_eq!(clean_team_name("!!!"), "");
    }

    #[test]
    fn test_progress_is_capped() {
        let record = TeamRecord::new(1, "Overachievers", 100.0)
            .unwrap()
            .with_current_points(Some(150.0));
        assert_eq!(record.progress_pct(), Some(100.0));

        let halfway = TeamRecord::new(2, "Halfway", 80.0)
            .unwrap()
            .with_current_points(Some(40.0));
        assert_eq!(halfway.progress_pct(), Some(50.0));
    }

    #[test]
    fn test_progress_needs_both_values() {
        let record = TeamRecord::new(1, "No Score Yet", 100.0).unwrap();
        assert_eq!(record.progress_pct(), None);
        assert_eq!(progress_pct(10.0, 0.0), None);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            TeamRecord::new(4, "###", 90.0),
            Err(RankingsError::Parse { team_number: 4, .. })
        ));
        assert!(TeamRecord::new(5, "Negative", -1.0).is_err());
        assert!(TeamRecord::new(6, "NaN", f64::NAN).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let record: TeamRecord = serde_json::from_str(
            r#"{"team_number": 2, "team_name": "Team #2 (Dogs)", "projected_points": 97.5}"#,
        )
        .unwrap();
        assert_eq!(record.team_name(), "Team 2 Dogs");
        assert_eq!(record.current_points(), None);

        let empty_name = r#"{"team_number": 3, "team_name": "!!!", "projected_points": 90.0}"#;
        assert!(serde_json::from_str::<TeamRecord>(empty_name).is_err());

        let negative = r#"{"team_number": 4, "team_name": "Neg", "projected_points": -5.0}"#;
        assert!(serde_json::from_str::<TeamRecord>(negative).is_err());
    }
}
