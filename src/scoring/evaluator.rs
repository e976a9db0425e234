use crate::catalog::{Criterion, RatingTable, Tool};
use crate::scoring::{CriterionFit, MatchScore, ScoreBreakdown, MAX_SCORE};

/// Match score in `[0, 10]` for `tool` against weighted `criteria`.
pub fn calculate_score(tool: &Tool, criteria: &[Criterion]) -> f64 {
    score_with_table(&RatingTable::from_tool(tool), criteria)
}

/// Weighted mean of per-criterion fit, importance as weight. A criterion is
/// fully met when the tool rating reaches the importance; shortfalls earn
/// `rating / importance` partial credit.
pub fn score_with_table(table: &RatingTable, criteria: &[Criterion]) -> f64 {
    let mut weighted_fit = 0.0;
    let mut weighted_total = 0.0;

    for criterion in criteria {
        let importance = f64::from(criterion.user_rating.max(1));
        let rating = f64::from(table.rating_for(criterion));
        weighted_fit += importance * criterion_fit(rating, importance);
        weighted_total += importance;
    }

    if weighted_total <= 0.0 {
        return 0.0;
    }
    (MAX_SCORE * weighted_fit / weighted_total).clamp(0.0, MAX_SCORE)
}

fn criterion_fit(rating: f64, importance: f64) -> f64 {
    if rating >= importance {
        1.0
    } else {
        (rating / importance).clamp(0.0, 1.0)
    }
}

/// Number of criteria where the tool rating meets or exceeds the importance.
pub fn criteria_match_count(tool: &Tool, criteria: &[Criterion]) -> usize {
    match_count_with_table(&RatingTable::from_tool(tool), criteria)
}

pub fn match_count_with_table(table: &RatingTable, criteria: &[Criterion]) -> usize {
    criteria
        .iter()
        .filter(|criterion| table.rating_for(criterion) >= criterion.user_rating)
        .count()
}

pub fn breakdown_with_table(
    tool: &Tool,
    table: &RatingTable,
    criteria: &[Criterion],
) -> ScoreBreakdown {
    let fits = criteria
        .iter()
        .map(|criterion| {
            let tool_rating = table.rating_for(criterion);
            CriterionFit {
                criterion_id: criterion.id.clone(),
                criterion_name: criterion.name.clone(),
                tool_rating,
                user_rating: criterion.user_rating,
                met: tool_rating >= criterion.user_rating,
                shortfall: criterion.user_rating.saturating_sub(tool_rating),
            }
        })
        .collect::<Vec<_>>();

    ScoreBreakdown {
        tool_id: tool.id.clone(),
        tool_name: tool.name.clone(),
        score: MatchScore::new(score_with_table(table, criteria)),
        matched: fits.iter().filter(|f| f.met).count(),
        total: fits.len(),
        fits,
    }
}

pub fn score_breakdown(tool: &Tool, criteria: &[Criterion]) -> ScoreBreakdown {
    breakdown_with_table(tool, &RatingTable::from_tool(tool), criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::defaults::{default_criteria, default_tools};

    fn criteria(ratings: &[(&str, u8)]) -> Vec<Criterion> {
        ratings
            .iter()
            .map(|(id, rating)| Criterion::new(*id, id.to_uppercase(), *rating))
            .collect()
    }

    fn tool(ratings: &[(&str, u8)]) -> Tool {
        ratings
            .iter()
            .fold(Tool::new("t", "T"), |tool, (id, rating)| {
                tool.with_rating(id, &id.to_uppercase(), *rating)
            })
    }

    #[test]
    fn tool_meeting_every_criterion_scores_ten() {
        let c = criteria(&[("a", 3), ("b", 5), ("c", 1)]);
        let t = tool(&[("a", 4), ("b", 5), ("c", 1)]);
        assert!((calculate_score(&t, &c) - 10.0).abs() < 1e-9);
        assert_eq!(criteria_match_count(&t, &c), 3);
    }

    #[test]
    fn tool_with_zero_ratings_scores_zero() {
        let c = criteria(&[("a", 3), ("b", 5)]);
        let t = tool(&[("a", 0), ("b", 0)]);
        assert_eq!(calculate_score(&t, &c), 0.0);
        assert_eq!(calculate_score(&Tool::new("empty", "Empty"), &c), 0.0);
    }

    #[test]
    fn empty_criteria_scores_zero_with_no_matches() {
        let t = tool(&[("a", 5)]);
        assert_eq!(calculate_score(&t, &[]), 0.0);
        assert_eq!(criteria_match_count(&t, &[]), 0);
    }

    #[test]
    fn shortfall_is_penalized_not_zeroed() {
        let c = criteria(&[("a", 4), ("b", 4)]);
        let t = tool(&[("a", 4), ("b", 2)]);
        let score = calculate_score(&t, &c);
        assert!(score > 0.0 && score < 10.0);
        assert!((score - 7.5).abs() < 1e-9);
    }

    #[test]
    fn higher_importance_weighs_more() {
        let c = criteria(&[("a", 5), ("b", 1)]);
        let strong_on_important = tool(&[("a", 5), ("b", 0)]);
        let strong_on_minor = tool(&[("a", 0), ("b", 5)]);
        assert!(
            calculate_score(&strong_on_important, &c) > calculate_score(&strong_on_minor, &c)
        );
    }

    #[test]
    fn score_is_bounded_and_monotonic_in_each_rating() {
        let c = criteria(&[("a", 2), ("b", 4), ("c", 5)]);
        for a in 0..=5u8 {
            for b in 0..=5u8 {
                let mut previous = -1.0;
                for rating in 0..=5u8 {
                    let t = tool(&[("a", a), ("b", b), ("c", rating)]);
                    let score = calculate_score(&t, &c);
                    assert!((0.0..=10.0).contains(&score));
                    assert!(score >= previous, "score dropped at c={rating}");
                    previous = score;
                }
            }
        }
    }

    #[test]
    fn match_count_never_exceeds_criteria_and_tracks_score() {
        let c = default_criteria();
        for t in default_tools() {
            assert!(criteria_match_count(&t, &c) <= c.len());
        }
        let fewer = tool(&[("a", 2), ("b", 5)]);
        let more = tool(&[("a", 3), ("b", 5)]);
        let c = criteria(&[("a", 3), ("b", 3)]);
        assert!(criteria_match_count(&more, &c) > criteria_match_count(&fewer, &c));
        assert!(calculate_score(&more, &c) >= calculate_score(&fewer, &c));
    }

    #[test]
    fn breakdown_reports_shortfalls() {
        let c = criteria(&[("a", 4), ("b", 2)]);
        let t = tool(&[("a", 1), ("b", 5)]);
        let breakdown = score_breakdown(&t, &c);
        assert_eq!(breakdown.matched, 1);
        assert_eq!(breakdown.total, 2);
        assert_eq!(breakdown.fits[0].shortfall, 3);
        assert!(!breakdown.fits[0].met);
        assert_eq!(breakdown.fits[1].shortfall, 0);
    }
}
