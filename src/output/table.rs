use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::bumpers::BumperStatus;
use crate::catalog::{Catalog, Criterion};
use crate::guided::RatingChange;
use crate::scoring::{RankedTool, ScoreBreakdown};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn score_cell(score: f64) -> Cell {
    let text = format!("{score:.1}");
    if score >= 8.0 {
        Cell::new(text).fg(Color::Green)
    } else if score >= 5.0 {
        Cell::new(text).fg(Color::Yellow)
    } else {
        Cell::new(text).fg(Color::Red)
    }
}

pub fn render_tools_table(catalog: &Catalog) -> String {
    let mut table = new_table();
    let mut header = vec!["Tool".to_string(), "Methodologies".to_string()];
    header.extend(catalog.criteria().iter().map(|c| c.name.clone()));
    table.set_header(header);

    for (tool, ratings) in catalog.entries() {
        let mut row = vec![tool.name.clone(), tool.methodologies().join(", ")];
        row.extend(catalog.criteria().iter().map(|c| match ratings.rating_for(c) {
            0 => "-".to_string(),
            r => r.to_string(),
        }));
        table.add_row(row);
    }
    table.to_string()
}

pub fn render_criteria_table(criteria: &[Criterion]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Id", "Criterion", "Importance", "Description"]);
    for criterion in criteria {
        table.add_row(vec![
            criterion.id.clone(),
            criterion.name.clone(),
            criterion.user_rating.to_string(),
            criterion.description.clone(),
        ]);
    }
    table.to_string()
}

pub fn render_ranking_table(ranked: &[RankedTool]) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Tool", "Score", "Criteria Met", "Methodologies"]);
    for entry in ranked {
        table.add_row(Row::from(vec![
            Cell::new(entry.rank),
            Cell::new(&entry.tool_name),
            score_cell(entry.score.rounded()),
            Cell::new(entry.match_label()),
            Cell::new(entry.methodologies.join(", ")),
        ]));
    }
    table.to_string()
}

/// One row per criterion, one column per compared tool.
pub fn render_comparison_table(breakdowns: &[ScoreBreakdown]) -> String {
    let mut table = new_table();
    let mut header = vec!["Criterion".to_string(), "Importance".to_string()];
    header.extend(breakdowns.iter().map(|b| b.tool_name.clone()));
    table.set_header(header);

    let Some(first) = breakdowns.first() else {
        return table.to_string();
    };
    for (idx, fit) in first.fits.iter().enumerate() {
        let mut row = Row::from(vec![
            Cell::new(&fit.criterion_name),
            Cell::new(fit.user_rating),
        ]);
        for breakdown in breakdowns {
            let cell = match breakdown.fits.get(idx) {
                Some(f) if f.met => Cell::new(f.tool_rating).fg(Color::Green),
                Some(f) => Cell::new(format!("{} (-{})", f.tool_rating, f.shortfall)).fg(Color::Red),
                None => Cell::new("-"),
            };
            row.add_cell(cell);
        }
        table.add_row(row);
    }

    let mut totals = Row::from(vec![Cell::new("Score"), Cell::new("")]);
    for breakdown in breakdowns {
        totals.add_cell(score_cell(breakdown.score.rounded()));
    }
    table.add_row(totals);
    table.to_string()
}

pub fn render_rating_changes_table(changes: &[RatingChange]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Criterion", "From", "To"]);
    for change in changes {
        table.add_row(vec![
            change.criterion_id.clone(),
            change.from.to_string(),
            change.to.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_bumper_status_table(status: &[BumperStatus]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Bumper",
        "Dismissed",
        "Shown",
        "Last Trigger",
        "Can Show",
    ]);
    for entry in status {
        let dismissed = if entry.state.dismissed {
            Cell::new("YES").fg(Color::Red)
        } else {
            Cell::new("NO")
        };
        let can_show = match &entry.blocked_by {
            None => Cell::new("YES").fg(Color::Green),
            Some(reason) => Cell::new(format!("NO ({reason})")).fg(Color::Yellow),
        };
        table.add_row(Row::from(vec![
            Cell::new(entry.kind.to_string()),
            dismissed,
            Cell::new(entry.state.show_count),
            Cell::new(
                entry
                    .state
                    .last_trigger
                    .map(|t| format!("{t:?}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            can_show,
        ]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{compare_tools, rank_tools};

    #[test]
    fn ranking_table_lists_every_tool() {
        let catalog = Catalog::with_defaults();
        let ranked = rank_tools(&catalog, catalog.criteria());
        let rendered = render_ranking_table(&ranked);
        for entry in &ranked {
            assert!(rendered.contains(&entry.tool_name));
        }
    }

    #[test]
    fn comparison_table_has_score_row() {
        let catalog = Catalog::with_defaults();
        let ids = vec!["jira".to_string(), "asana".to_string()];
        let breakdowns = compare_tools(&catalog, &ids, catalog.criteria()).expect("known tools");
        let rendered = render_comparison_table(&breakdowns);
        assert!(rendered.contains("Score"));
        assert!(rendered.contains("Scalability"));
    }
}
