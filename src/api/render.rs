//! HTML rendering of a snapshot.

use chrono_tz::Tz;
use std::fmt::Write;

use crate::config::{parse_timezone, DisplayConfig};
use crate::domain::Snapshot;
use crate::error::{RankingsError, Result};

/// Body served when there is nothing to show yet
pub const NO_DATA_MESSAGE: &str =
    "Rankings data is being collected. Please check back in a few minutes.";

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2rem auto; max-width: 56rem; color: #222; }
h1 { font-size: 1.6rem; margin-bottom: 0.25rem; }
.meta { color: #666; margin-bottom: 1.25rem; }
table { border-collapse: collapse; width: 100%; }
th, td { padding: 0.5rem 0.75rem; border-bottom: 1px solid #e3e3e3; text-align: left; }
th { background: #f5f5f7; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.bar { background: #eee; border-radius: 4px; height: 0.6rem; width: 8rem; overflow: hidden; }
.bar span { display: block; height: 100%; background: #3c8d40; }
tr.F-positive td, tr.F-win td { background: #eef8ee; }
tr.F-negative td, tr.F-loss td { background: #fbeeee; }
"#;

/// Turns a snapshot into the ranking page
#[derive(Debug, Clone)]
pub struct Presenter {
    title: String,
    tz: Tz,
}

impl Presenter {
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        Ok(Self {
            title: config.title.clone(),
            tz: parse_timezone(&config.timezone).map_err(RankingsError::InvalidConfig)?,
        })
    }

    /// "Oct 19, 2026 03:04 PM PDT" in the display timezone
    pub fn format_timestamp(&self, snapshot: &Snapshot) -> String {
        snapshot
            .last_updated
            .with_timezone(&self.tz)
            .format("%b %d, %Y %I:%M %p %Z")
            .to_string()
    }

    pub fn render(&self, snapshot: &Snapshot) -> String {
        let show_current = snapshot.teams().iter().any(|t| t.current_points().is_some());
        let title = escape_html(&self.title);

        let mut html = String::with_capacity(4096);
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
        );

        let _ = write!(html, "<p class=\"meta\">");
        if let Some(week) = &snapshot.current_week {
            let _ = write!(html, "{} &middot; ", escape_html(week));
        }
        let _ = writeln!(html, "Last updated: {}</p>", self.format_timestamp(snapshot));

        html.push_str("<table>\n<thead><tr><th>Rank</th><th>Team</th>");
        if show_current {
            html.push_str("<th>Current</th>");
        }
        html.push_str("<th>Projected</th>");
        if show_current {
            html.push_str("<th>Progress</th>");
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        for (idx, team) in snapshot.teams().iter().enumerate() {
            match team.color_class() {
                Some(class) => {
                    let _ = write!(html, "<tr class=\"{}\">", escape_html(class));
                }
                None => html.push_str("<tr>"),
            }
            let _ = write!(
                html,
                "<td>{}</td><td>{}</td>",
                idx + 1,
                escape_html(team.team_name())
            );
            if show_current {
                match team.current_points() {
                    Some(points) => {
                        let _ = write!(html, "<td class=\"num\">{points:.2}</td>");
                    }
                    None => html.push_str("<td class=\"num\">&ndash;</td>"),
                }
            }
            let _ = write!(html, "<td class=\"num\">{:.2}</td>", team.projected_points());
            if show_current {
                match team.progress_pct() {
                    Some(pct) => {
                        let _ = write!(
                            html,
                            "<td><div class=\"bar\" title=\"{pct:.0}%\">\
                             <span style=\"width: {pct:.0}%\"></span></div></td>"
                        );
                    }
                    None => html.push_str("<td></td>"),
                }
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
        html
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TeamRecord;
    use chrono::{TimeZone, Utc};

    fn presenter() -> Presenter {
        Presenter::new(&DisplayConfig::default()).unwrap()
    }

    fn snapshot(teams: Vec<TeamRecord>) -> Snapshot {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 22, 4, 0).unwrap();
        Snapshot::new(teams, at, Some("Week 7".into()))
    }

    #[test]
    fn test_timestamp_in_display_timezone() {
        let snap = snapshot(vec![TeamRecord::new(1, "A", 1.0).unwrap()]);
        assert_eq!(presenter().format_timestamp(&snap), "Oct 19, 2026 03:04 PM PDT");
    }

    #[test]
    fn test_renders_ranked_rows() {
        let snap = snapshot(vec![
            TeamRecord::new(1, "Low Scorers", 95.5).unwrap(),
            TeamRecord::new(2, "High Flyers", 120.0).unwrap(),
        ]);
        let html = presenter().render(&snap);

        let high = html.find("<td>1</td><td>High Flyers</td>").unwrap();
        let low = html.find("<td>2</td><td>Low Scorers</td>").unwrap();
        assert!(high < low);
        assert!(html.contains("<td class=\"num\">120.00</td>"));
        assert!(html.contains("<td class=\"num\">95.50</td>"));
        assert!(html.contains("Week 7 &middot; Last updated: Oct 19, 2026 03:04 PM PDT"));
        assert!(!html.contains("<th>Progress</th>"));
    }

    #[test]
    fn test_progress_columns_when_current_points_known() {
        let snap = snapshot(vec![
            TeamRecord::new(1, "Ahead", 100.0)
                .unwrap()
                .with_current_points(Some(150.0))
                .with_color_class(Some("F-positive".into())),
            TeamRecord::new(2, "Behind", 90.0).unwrap(),
        ]);
        let html = presenter().render(&snap);

        assert!(html.contains("<th>Progress</th>"));
        assert!(html.contains("<tr class=\"F-positive\">"));
        assert!(html.contains("width: 100%"));
        assert!(html.contains("<td class=\"num\">&ndash;</td>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom & Jerry's\"</b>"),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }
}
