use crate::catalog::{Catalog, RatingTable, Tool};
use crate::filter::{FilterCondition, FilterMode, ResolvedCondition};
use crate::scoring::RankedTool;

fn condition_passes(tool: &Tool, table: &RatingTable, condition: &ResolvedCondition<'_>) -> bool {
    match condition {
        ResolvedCondition::Methodology(name) => tool.has_methodology(name),
        ResolvedCondition::Criteria {
            criterion,
            operator,
            threshold,
        } => operator.apply(table.rating_by_key(criterion), *threshold),
    }
}

/// Whether `tool` passes the complete conditions under `mode`. Incomplete
/// conditions are skipped; with none left every tool passes.
pub fn matches_conditions(
    tool: &Tool,
    table: &RatingTable,
    conditions: &[FilterCondition],
    mode: FilterMode,
) -> bool {
    let mut complete = conditions.iter().filter_map(FilterCondition::resolve).peekable();
    if complete.peek().is_none() {
        return true;
    }
    match mode {
        FilterMode::And => complete.all(|c| condition_passes(tool, table, &c)),
        FilterMode::Or => complete.any(|c| condition_passes(tool, table, &c)),
    }
}

pub fn filter_tools<'a>(
    tools: &'a [Tool],
    conditions: &[FilterCondition],
    mode: FilterMode,
) -> Vec<&'a Tool> {
    tools
        .iter()
        .filter(|tool| matches_conditions(tool, &RatingTable::from_tool(tool), conditions, mode))
        .collect()
}

/// Same as [`filter_tools`] but reuses the catalog's rating tables.
pub fn filter_catalog<'a>(
    catalog: &'a Catalog,
    conditions: &[FilterCondition],
    mode: FilterMode,
) -> Vec<&'a Tool> {
    catalog
        .entries()
        .filter(|(tool, table)| matches_conditions(tool, table, conditions, mode))
        .map(|(tool, _)| tool)
        .collect()
}

/// Narrows an already-ranked list, keeping its order and ranks.
pub fn filter_ranked(
    catalog: &Catalog,
    ranked: &[RankedTool],
    conditions: &[FilterCondition],
    mode: FilterMode,
) -> Vec<RankedTool> {
    ranked
        .iter()
        .filter(|entry| {
            catalog
                .entries()
                .find(|(tool, _)| tool.id == entry.tool_id)
                .map(|(tool, table)| matches_conditions(tool, table, conditions, mode))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Tag;
    use crate::filter::{Comparison, ConditionType};
    use crate::scoring::rank_tools;

    fn ids(tools: &[&Tool]) -> Vec<String> {
        tools.iter().map(|t| t.id.clone()).collect()
    }

    fn abc() -> Vec<Tool> {
        vec![
            Tool::new("a", "A")
                .with_tag(Tag::methodology("Agile"))
                .with_rating("x", "X", 5)
                .with_rating("y", "Y", 1),
            Tool::new("b", "B")
                .with_tag(Tag::methodology("Waterfall"))
                .with_rating("x", "X", 1)
                .with_rating("y", "Y", 5),
            Tool::new("c", "C")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Waterfall"))
                .with_rating("x", "X", 5)
                .with_rating("y", "Y", 5),
        ]
    }

    fn x_and_y() -> Vec<FilterCondition> {
        vec![
            FilterCondition::criteria("1", "x", Comparison::GreaterOrEqual, 4),
            FilterCondition::criteria("2", "y", Comparison::GreaterOrEqual, 4),
        ]
    }

    #[test]
    fn and_requires_every_condition() {
        let tools = abc();
        let result = filter_tools(&tools, &x_and_y(), FilterMode::And);
        assert_eq!(ids(&result), vec!["c"]);
    }

    #[test]
    fn or_requires_any_condition() {
        let tools = abc();
        let result = filter_tools(&tools, &x_and_y(), FilterMode::Or);
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn methodology_conditions_match_tags() {
        let tools = abc();
        let conditions = vec![FilterCondition::methodology("m", "waterfall")];
        let result = filter_tools(&tools, &conditions, FilterMode::And);
        assert_eq!(ids(&result), vec!["b", "c"]);
    }

    #[test]
    fn incomplete_conditions_never_remove_tools() {
        let tools = abc();
        let mut missing_operator = FilterCondition::criteria("1", "x", Comparison::Greater, 4);
        missing_operator.operator = None;
        let mut missing_rating = FilterCondition::criteria("2", "y", Comparison::Greater, 4);
        missing_rating.rating = None;
        let blank = FilterCondition::blank("3", ConditionType::Methodology);
        let conditions = vec![missing_operator, missing_rating, blank];

        for mode in [FilterMode::And, FilterMode::Or] {
            let result = filter_tools(&tools, &conditions, mode);
            assert_eq!(result.len(), tools.len());
        }
    }

    #[test]
    fn incomplete_conditions_are_ignored_alongside_complete_ones() {
        let tools = abc();
        let mut conditions = vec![FilterCondition::criteria(
            "1",
            "x",
            Comparison::GreaterOrEqual,
            4,
        )];
        conditions.push(FilterCondition::blank("2", ConditionType::Criteria));
        let and = filter_tools(&tools, &conditions, FilterMode::And);
        let or = filter_tools(&tools, &conditions, FilterMode::Or);
        assert_eq!(ids(&and), vec!["a", "c"]);
        assert_eq!(ids(&or), vec!["a", "c"]);
    }

    #[test]
    fn filtering_is_idempotent_and_order_independent() {
        let tools = abc();
        let mut conditions = x_and_y();
        conditions.push(FilterCondition::methodology("m", "Agile"));

        for mode in [FilterMode::And, FilterMode::Or] {
            let once: Vec<Tool> = filter_tools(&tools, &conditions, mode)
                .into_iter()
                .cloned()
                .collect();
            let twice = filter_tools(&once, &conditions, mode);
            assert_eq!(ids(&twice), once.iter().map(|t| t.id.clone()).collect::<Vec<_>>());

            let mut reversed = conditions.clone();
            reversed.reverse();
            let swapped = filter_tools(&tools, &reversed, mode);
            assert_eq!(ids(&swapped), once.iter().map(|t| t.id.clone()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn all_comparison_operators_apply_numerically() {
        let tools = abc();
        let cases = [
            (Comparison::Greater, 1, vec!["a", "c"]),
            (Comparison::GreaterOrEqual, 5, vec!["a", "c"]),
            (Comparison::Equal, 1, vec!["b"]),
            (Comparison::LessOrEqual, 1, vec!["b"]),
            (Comparison::Less, 5, vec!["b"]),
        ];
        for (operator, rating, expected) in cases {
            let conditions = vec![FilterCondition::criteria("1", "X", operator, rating)];
            let result = filter_tools(&tools, &conditions, FilterMode::And);
            assert_eq!(ids(&result), expected, "operator {operator}");
        }
    }

    #[test]
    fn filter_ranked_keeps_rank_order() {
        let catalog = Catalog::new(abc(), vec![crate::catalog::Criterion::new("y", "Y", 5)]);
        let ranked = rank_tools(&catalog, catalog.criteria());
        let conditions = vec![FilterCondition::methodology("m", "Waterfall")];
        let narrowed = filter_ranked(&catalog, &ranked, &conditions, FilterMode::And);
        let narrowed_ids = narrowed.iter().map(|r| r.tool_id.as_str()).collect::<Vec<_>>();
        assert_eq!(narrowed_ids, vec!["b", "c"]);
        assert_eq!(filter_catalog(&catalog, &conditions, FilterMode::Or).len(), 2);
    }
}
