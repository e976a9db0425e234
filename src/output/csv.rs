use anyhow::Result;

use crate::bumpers::BumperStatus;
use crate::catalog::Catalog;
use crate::scoring::{RankedTool, ScoreBreakdown};

pub fn ranking_to_csv(ranked: &[RankedTool]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "rank",
        "tool_id",
        "tool_name",
        "score",
        "criteria_met",
        "criteria_total",
        "methodologies",
    ])?;
    for entry in ranked {
        writer.write_record([
            entry.rank.to_string(),
            entry.tool_id.clone(),
            entry.tool_name.clone(),
            format!("{:.1}", entry.score.rounded()),
            entry.matched.to_string(),
            entry.total.to_string(),
            entry.methodologies.join(";"),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Long format: one record per tool and criterion.
pub fn comparison_to_csv(breakdowns: &[ScoreBreakdown]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "tool_id",
        "criterion_id",
        "tool_rating",
        "user_rating",
        "met",
        "shortfall",
        "score",
    ])?;
    for breakdown in breakdowns {
        for fit in &breakdown.fits {
            writer.write_record([
                breakdown.tool_id.clone(),
                fit.criterion_id.clone(),
                fit.tool_rating.to_string(),
                fit.user_rating.to_string(),
                fit.met.to_string(),
                fit.shortfall.to_string(),
                format!("{:.1}", breakdown.score.rounded()),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn tools_to_csv(catalog: &Catalog) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    let mut header = vec!["tool_id".to_string(), "tool_name".to_string()];
    header.extend(catalog.criteria().iter().map(|c| c.id.clone()));
    writer.write_record(&header)?;
    for (tool, ratings) in catalog.entries() {
        let mut record = vec![tool.id.clone(), tool.name.clone()];
        record.extend(
            catalog
                .criteria()
                .iter()
                .map(|c| ratings.rating_for(c).to_string()),
        );
        writer.write_record(&record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn bumper_status_to_csv(status: &[BumperStatus]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["bumper", "dismissed", "show_count", "blocked_by"])?;
    for entry in status {
        writer.write_record([
            entry.kind.as_slug().to_string(),
            entry.state.dismissed.to_string(),
            entry.state.show_count.to_string(),
            entry
                .blocked_by
                .map(|reason| reason.to_string())
                .unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::rank_tools;

    #[test]
    fn ranking_csv_has_header_and_one_row_per_tool() {
        let catalog = Catalog::with_defaults();
        let ranked = rank_tools(&catalog, catalog.criteria());
        let out = ranking_to_csv(&ranked).expect("csv");
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("rank,tool_id,tool_name,score,criteria_met,criteria_total,methodologies")
        );
        assert_eq!(lines.count(), catalog.tools().len());
    }
}
