//! League table extraction: one page, one table, every team.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::extract::{compile, element_text, highlight_class, parse_points, week_number};
use crate::config::{ExtractConfig, TableRules};
use crate::domain::TeamRecord;
use crate::error::{RankingsError, Result};

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    name: usize,
    projected: usize,
    current: Option<usize>,
}

pub struct TableExtractor {
    rules: TableRules,
    table: Selector,
    row: Selector,
    cell: Selector,
    header_cell: Selector,
    highlight_prefix: String,
    week_selectors: Vec<Selector>,
}

impl TableExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            rules: config.table.clone(),
            table: compile(&config.table.table_selector)?,
            row: compile("tr")?,
            cell: compile("th, td")?,
            header_cell: compile("th")?,
            highlight_prefix: config.highlight_class_prefix.clone(),
            week_selectors: config
                .week_selectors
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_>>()?,
        })
    }

    /// Extract every parsable row. Rows that fail to parse are logged and skipped.
    pub fn extract_all(&self, html: &str) -> Result<Vec<TeamRecord>> {
        let doc = Html::parse_document(html);
        let week = week_number(&doc, &self.week_selectors);

        let (table, header_row, columns) = doc
            .select(&self.table)
            .find_map(|table| {
                let (row, columns) = self.header(table)?;
                Some((table, row, columns))
            })
            .ok_or_else(|| RankingsError::Parse {
                team_number: 0,
                reason: format!(
                    "no table with header {:?} and {:?}",
                    self.rules.name_header, self.rules.projected_header
                ),
            })?;

        let mut records = Vec::new();
        let body_rows = table
            .select(&self.row)
            .filter(|row| row.id() != header_row.id() && has_data_cell(row));

        for (idx, row) in body_rows.enumerate() {
            let team_number = idx as u32 + 1;
            match self.parse_row(team_number, row, columns) {
                Ok(record) => records.push(record.with_week_number(week)),
                Err(e) => warn!("Skipping table row {}: {}", team_number, e),
            }
        }

        Ok(records)
    }

    fn header<'a>(&self, table: ElementRef<'a>) -> Option<(ElementRef<'a>, Columns)> {
        table.select(&self.row).find_map(|row| {
            let labels: Vec<String> = row.select(&self.header_cell).map(element_text).collect();
            let position = |label: &str| labels.iter().position(|l| l.eq_ignore_ascii_case(label));

            let columns = Columns {
                name: position(self.rules.name_header.as_str())?,
                projected: position(self.rules.projected_header.as_str())?,
                current: self.rules.current_header.as_deref().and_then(position),
            };
            Some((row, columns))
        })
    }

    fn parse_row(
        &self,
        team_number: u32,
        row: ElementRef<'_>,
        columns: Columns,
    ) -> Result<TeamRecord> {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
        let cell_text = |idx: usize| cells.get(idx).map(|c| element_text(*c));

        let name = cell_text(columns.name).ok_or_else(|| RankingsError::Parse {
            team_number,
            reason: "row has no team name cell".to_string(),
        })?;

        let projected = cell_text(columns.projected)
            .as_deref()
            .and_then(parse_points)
            .ok_or_else(|| RankingsError::Parse {
                team_number,
                reason: "projected points missing or non-numeric".to_string(),
            })?;

        let current = columns
            .current
            .and_then(cell_text)
            .as_deref()
            .and_then(parse_points);

        Ok(TeamRecord::new(team_number, &name, projected)?
            .with_current_points(current)
            .with_color_class(highlight_class(&row, &self.highlight_prefix)))
    }
}

fn has_data_cell(row: &ElementRef<'_>) -> bool {
    row.children()
        .filter_map(ElementRef::wrap)
        .any(|c| c.value().name() == "td")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAGUE_TABLE: &str = r#"
        <html><body>
        <h2 class="Week-label">Week 9</h2>
        <table class="standings">
          <thead><tr><th>Rank</th><th>Team</th><th>Pts</th><th>Proj</th></tr></thead>
          <tbody>
            <tr class="F-win"><td>1</td><td>Gridiron Gurus!</td><td>150.0</td><td>100.0</td></tr>
            <tr><td>2</td><td>Bench Warmers</td><td>40.5</td><td>95.25</td></tr>
            <tr><td>3</td><td>Broken Row</td><td>12.0</td><td>-</td></tr>
            <tr><td>4</td><td>Late Starters</td><td></td><td>110.0</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    fn extractor() -> TableExtractor {
        TableExtractor::new(&ExtractConfig::default()).unwrap()
    }

    #[test]
    fn test_extracts_rows_by_header_labels() {
        let records = extractor().extract_all(LEAGUE_TABLE).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.team_number(), 1);
        assert_eq!(first.team_name(), "Gridiron Gurus");
        assert_eq!(first.projected_points(), 100.0);
        assert_eq!(first.current_points(), Some(150.0));
        assert_eq!(first.progress_pct(), Some(100.0));
        assert_eq!(first.color_class(), Some("F-win"));
        assert_eq!(first.week_number(), Some(9));

        assert_eq!(records[1].progress_pct().map(|p| p.round()), Some(43.0));

        let late = &records[2];
        assert_eq!(late.team_number(), 4);
        assert_eq!(late.current_points(), None);
        assert_eq!(late.progress_pct(), None);
    }

    #[test]
    fn test_missing_header_is_error() {
        let html = "<table><tr><th>Owner</th><th>Score</th></tr>\
                    <tr><td>x</td><td>1</td></tr></table>";
        assert!(matches!(
            extractor().extract_all(html),
            Err(RankingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_picks_the_table_with_matching_header() {
        let html = r#"
            <table><tr><th>Date</th><th>Opponent</th></tr><tr><td>Sun</td><td>Them</td></tr></table>
            <table>
              <tr><th>Team</th><th>Proj</th></tr>
              <tr><td>Only Team</td><td>77.7</td></tr>
            </table>
        "#;
        let records = extractor().extract_all(html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].team_name(), "Only Team");
        assert_eq!(records[0].current_points(), None);
    }
}
