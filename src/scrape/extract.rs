//! Team page extraction.
//!
//! Every field is located by an ordered list of strategies compiled from
//! [`ExtractConfig`]. The first strategy that yields a value wins.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

use crate::config::{ExtractConfig, PointsRule};
use crate::domain::{clean_team_name, TeamRecord};
use crate::error::{RankingsError, Result};

/// Ways of locating a labelled number on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsStrategy {
    /// Container whose text mentions the label, value in a child element
    ContainerLabel,
    /// Leaf element whose text is exactly the label, value in its next sibling
    LabelSibling,
    /// First number following the label in the flattened page text
    TextScan,
}

impl PointsStrategy {
    pub const DEFAULT_ORDER: [PointsStrategy; 3] = [
        PointsStrategy::ContainerLabel,
        PointsStrategy::LabelSibling,
        PointsStrategy::TextScan,
    ];

    fn apply(&self, doc: &Html, rule: &CompiledRule, any: &Selector) -> Option<f64> {
        match self {
            PointsStrategy::ContainerLabel => doc
                .select(&rule.container)
                .filter(|c| element_text(*c).contains(&rule.label))
                .find_map(|c| {
                    c.select(&rule.value)
                        .find_map(|v| parse_points(&element_text(v)))
                }),
            PointsStrategy::LabelSibling => doc
                .select(any)
                .filter(|el| el.children().filter_map(ElementRef::wrap).next().is_none())
                .filter(|el| element_text(*el) == rule.label)
                .find_map(|el| {
                    let sibling = el.next_siblings().find_map(ElementRef::wrap)?;
                    parse_points(&element_text(sibling))
                }),
            PointsStrategy::TextScan => {
                let text = element_text(doc.root_element());
                let (_, after) = text.split_once(rule.label.as_str())?;
                after.split_whitespace().take(3).find_map(parse_points)
            }
        }
    }
}

pub(crate) struct CompiledRule {
    label: String,
    container: Selector,
    value: Selector,
}

impl CompiledRule {
    fn new(rule: &PointsRule) -> Result<Self> {
        Ok(Self {
            label: rule.label.clone(),
            container: compile(&rule.container_selector)?,
            value: compile(&rule.value_selector)?,
        })
    }
}

/// Extracts one [`TeamRecord`] from one team page
pub struct TeamPageExtractor {
    name_selectors: Vec<Selector>,
    projected: CompiledRule,
    current: Option<CompiledRule>,
    strategies: Vec<PointsStrategy>,
    highlight_prefix: String,
    week_selectors: Vec<Selector>,
    any: Selector,
}

impl TeamPageExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let strategies = if config.strategies.is_empty() {
            PointsStrategy::DEFAULT_ORDER.to_vec()
        } else {
            config.strategies.clone()
        };

        Ok(Self {
            name_selectors: compile_all(&config.team_name_selectors)?,
            projected: CompiledRule::new(&config.projected)?,
            current: config.current.as_ref().map(CompiledRule::new).transpose()?,
            strategies,
            highlight_prefix: config.highlight_class_prefix.clone(),
            week_selectors: compile_all(&config.week_selectors)?,
            any: compile("*")?,
        })
    }

    /// Parse a team page. Missing name or projection is a per-team parse error.
    pub fn extract(&self, team_number: u32, html: &str) -> Result<TeamRecord> {
        let doc = Html::parse_document(html);

        let name = self.team_name(&doc).ok_or_else(|| RankingsError::Parse {
            team_number,
            reason: "team name element not found".to_string(),
        })?;

        let projected = self
            .points(&doc, &self.projected)
            .ok_or_else(|| RankingsError::Parse {
                team_number,
                reason: format!("no numeric value for {:?}", self.projected.label),
            })?;

        let current = self.current.as_ref().and_then(|rule| self.points(&doc, rule));

        Ok(TeamRecord::new(team_number, &name, projected)?
            .with_current_points(current)
            .with_color_class(self.color_class(&doc))
            .with_week_number(week_number(&doc, &self.week_selectors)))
    }

    fn team_name(&self, doc: &Html) -> Option<String> {
        self.name_selectors
            .iter()
            .flat_map(|sel| doc.select(sel))
            .map(element_text)
            .find(|text| !clean_team_name(text).is_empty())
    }

    fn points(&self, doc: &Html, rule: &CompiledRule) -> Option<f64> {
        self.strategies.iter().find_map(|strategy| {
            let value = strategy.apply(doc, rule, &self.any);
            if value.is_some() {
                debug!("{:?} matched {:?} via {:?}", rule.label, value, strategy);
            }
            value
        })
    }

    fn color_class(&self, doc: &Html) -> Option<String> {
        highlight_class(&doc.select(&self.projected.container).next()?, &self.highlight_prefix)
    }
}

/// First class on `el` starting with `prefix`
pub(crate) fn highlight_class(el: &ElementRef<'_>, prefix: &str) -> Option<String> {
    if prefix.is_empty() {
        return None;
    }
    el.value()
        .classes()
        .find(|c| c.starts_with(prefix))
        .map(str::to_string)
}

/// Week number from the first selector whose text reads "Week <n>"
pub(crate) fn week_number(doc: &Html, selectors: &[Selector]) -> Option<u32> {
    selectors
        .iter()
        .flat_map(|sel| doc.select(sel))
        .find_map(|el| parse_week(&element_text(el)))
}

/// Visible text of an element, whitespace-normalised
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a points figure such as `"112.34"`, `"1,204.5"` or `"98.1:"`.
pub fn parse_points(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `"Week 7"` (case-insensitive, any surrounding text) into `7`
pub fn parse_week(text: &str) -> Option<u32> {
    let lower = text.to_ascii_lowercase();
    let idx = lower.find("week")?;
    let digits: String = lower[idx + 4..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

pub(crate) fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RankingsError::Selector(format!("{selector:?}: {e:?}")))
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>> {
    selectors.iter().map(|s| compile(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TeamPageExtractor {
        TeamPageExtractor::new(&ExtractConfig::default()).unwrap()
    }

    const TEAM_PAGE: &str = r#"
        <html><body>
          <div class="Navtarget"><span class="team-name">Team #1 (Champs!)</span></div>
          <span class="flyout-title">Week 7</span>
          <div class="team-card-stats F-positive">
            <span>Proj Points</span> <span class="Fw-b">123.45</span>
          </div>
          <div class="team-card-score"><span>Pts</span> <span class="Fw-b">61.2</span></div>
        </body></html>
    "#;

    #[test]
    fn test_primary_strategy() {
        let record = extractor().extract(1, TEAM_PAGE).unwrap();
        assert_eq!(record.team_name(), "Team 1 Champs");
        assert_eq!(record.projected_points(), 123.45);
        assert_eq!(record.current_points(), Some(61.2));
        assert_eq!(record.color_class(), Some("F-positive"));
        assert_eq!(record.week_number(), Some(7));
    }

    #[test]
    fn test_falls_back_to_label_sibling() {
        let html = r#"
            <a class="team-name">Sibling Squad</a>
            <dl><dt>Proj Points</dt><dd>101.5</dd></dl>
        "#;
        let record = extractor().extract(2, html).unwrap();
        assert_eq!(record.team_name(), "Sibling Squad");
        assert_eq!(record.projected_points(), 101.5);
        assert_eq!(record.current_points(), None);
        assert_eq!(record.color_class(), None);
    }

    #[test]
    fn test_falls_back_to_text_scan() {
        let html = r#"
            <span class="team-name">Scanners</span>
            <p>This week: Proj Points: 88.75 (up 3)</p>
        "#;
        let record = extractor().extract(3, html).unwrap();
        assert_eq!(record.projected_points(), 88.75);
    }

    #[test]
    fn test_non_numeric_points_is_parse_error() {
        let html = r#"
            <span class="team-name">Broken</span>
            <div class="team-card-stats"><span>Proj Points</span><span class="Fw-b">--</span></div>
        "#;
        let err = extractor().extract(4, html).unwrap_err();
        assert!(matches!(err, RankingsError::Parse { team_number: 4, .. }));
    }

    #[test]
    fn test_missing_name_is_parse_error() {
        let html = r#"<div class="team-card-stats">Proj Points <span class="Fw-b">90</span></div>"#;
        let err = extractor().extract(5, html).unwrap_err();
        assert!(matches!(err, RankingsError::Parse { team_number: 5, .. }));
    }

    #[test]
    fn test_skips_name_elements_that_clean_to_nothing() {
        let html = r#"
            <span class="team-name">🏈</span>
            <a class="team-name">Real Name</a>
            <div class="team-card-stats">Proj Points <span class="Fw-b">90</span></div>
        "#;
        let record = extractor().extract(6, html).unwrap();
        assert_eq!(record.team_name(), "Real Name");
    }

    #[test]
    fn test_configured_strategy_order() {
        let mut config = ExtractConfig::default();
        config.strategies = vec![PointsStrategy::TextScan];
        let extractor = TeamPageExtractor::new(&config).unwrap();

        // Only the text scan runs, so the first number after the label wins
        let html = r#"
            <span class="team-name">Ordered</span>
            <div class="team-card-stats">Proj Points 70 <span class="Fw-b">95</span></div>
        "#;
        assert_eq!(extractor.extract(7, html).unwrap().projected_points(), 70.0);
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let mut config = ExtractConfig::default();
        config.team_name_selectors = vec!["span[".to_string()];
        assert!(matches!(
            TeamPageExtractor::new(&config),
            Err(RankingsError::Selector(_))
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_points(" 1,204.50 "), Some(1204.5));
        assert_eq!(parse_points("98.1:"), Some(98.1));
        assert_eq!(parse_points("n/a"), None);
        assert_eq!(parse_week("Week 12 Matchup"), Some(12));
        assert_eq!(parse_week("WEEK  3"), Some(3));
        assert_eq!(parse_week("Playoffs"), None);
    }
}
