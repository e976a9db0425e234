use std::cmp::Ordering;

use crate::catalog::{Catalog, CatalogError, Criterion};
use crate::scoring::evaluator::{breakdown_with_table, match_count_with_table, score_with_table};
use crate::scoring::{MatchScore, RankedTool, ScoreBreakdown};

/// Every catalog tool scored against `criteria`, best first. Ties break on
/// match count, then name, so the order is stable for a given input.
pub fn rank_tools(catalog: &Catalog, criteria: &[Criterion]) -> Vec<RankedTool> {
    let mut ranked = catalog
        .entries()
        .map(|(tool, table)| RankedTool {
            rank: 0,
            tool_id: tool.id.clone(),
            tool_name: tool.name.clone(),
            score: MatchScore::new(score_with_table(table, criteria)),
            matched: match_count_with_table(table, criteria),
            total: criteria.len(),
            methodologies: tool
                .methodologies()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| {
        b.score
            .value()
            .total_cmp(&a.score.value())
            .then_with(|| b.matched.cmp(&a.matched))
            .then_with(|| compare_names(&a.tool_name, &b.tool_name))
    });
    for (idx, entry) in ranked.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }
    ranked
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_ascii_lowercase()
        .cmp(&b.to_ascii_lowercase())
        .then_with(|| a.cmp(b))
}

/// Tool ids in ranked order, the sequence the order watcher observes.
pub fn ranked_ids(ranked: &[RankedTool]) -> Vec<String> {
    ranked.iter().map(|r| r.tool_id.clone()).collect()
}

/// Side-by-side breakdowns for the named tools, in the order requested.
pub fn compare_tools(
    catalog: &Catalog,
    tool_ids: &[String],
    criteria: &[Criterion],
) -> Result<Vec<ScoreBreakdown>, CatalogError> {
    let mut out = Vec::with_capacity(tool_ids.len());
    for raw in tool_ids {
        let tool = catalog
            .tool(raw)
            .ok_or_else(|| CatalogError::UnknownTool(raw.clone()))?;
        let table = catalog
            .table_for(&tool.id)
            .ok_or_else(|| CatalogError::UnknownTool(raw.clone()))?;
        out.push(breakdown_with_table(tool, table, criteria));
    }
    Ok(out)
}
