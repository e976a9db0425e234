pub mod evaluator;
pub mod ranking;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use evaluator::{calculate_score, criteria_match_count, score_breakdown};
pub use ranking::{compare_tools, rank_tools, ranked_ids};

pub const MAX_SCORE: f64 = 10.0;

/// Score clamped into `[0, 10]`; displayed to one decimal place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd, Default)]
#[serde(transparent)]
pub struct MatchScore(f64);

impl MatchScore {
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(0.0);
        }
        Self(raw.clamp(0.0, MAX_SCORE))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn rounded(self) -> f64 {
        ((self.0 * 10.0).round() / 10.0).clamp(0.0, MAX_SCORE)
    }
}

impl Display for MatchScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.rounded())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionFit {
    pub criterion_id: String,
    pub criterion_name: String,
    pub tool_rating: u8,
    pub user_rating: u8,
    pub met: bool,
    pub shortfall: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub tool_id: String,
    pub tool_name: String,
    pub score: MatchScore,
    pub matched: usize,
    pub total: usize,
    pub fits: Vec<CriterionFit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedTool {
    pub rank: usize,
    pub tool_id: String,
    pub tool_name: String,
    pub score: MatchScore,
    pub matched: usize,
    pub total: usize,
    pub methodologies: Vec<String>,
}

impl RankedTool {
    pub fn match_label(&self) -> String {
        format!("{}/{}", self.matched, self.total)
    }
}
