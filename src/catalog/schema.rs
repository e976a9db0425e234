use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Methodology,
    Function,
    Other,
}

impl Display for TagKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Methodology => "Methodology",
            Self::Function => "Function",
            Self::Other => "Other",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TagKind,
}

impl Tag {
    pub fn methodology(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TagKind::Methodology,
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TagKind::Function,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCriterionRating {
    pub id: String,
    pub name: String,
    pub ranking: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<ToolCriterionRating>,
}

impl Tool {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            logo: String::new(),
            tags: Vec::new(),
            use_cases: Vec::new(),
            criteria: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_rating(mut self, id: &str, name: &str, ranking: u8) -> Self {
        self.criteria.push(ToolCriterionRating {
            id: id.to_string(),
            name: name.to_string(),
            ranking: ranking.min(MAX_RATING),
            description: None,
        });
        self
    }

    pub fn with_use_case(mut self, use_case: &str) -> Self {
        self.use_cases.push(use_case.to_string());
        self
    }

    pub fn with_logo(mut self, logo: &str) -> Self {
        self.logo = logo.to_string();
        self
    }

    pub fn has_methodology(&self, methodology: &str) -> bool {
        let wanted = methodology.trim();
        self.tags
            .iter()
            .filter(|tag| tag.kind == TagKind::Methodology)
            .any(|tag| tag.name.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn methodologies(&self) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| tag.kind == TagKind::Methodology)
            .map(|tag| tag.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_importance")]
    pub user_rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip_description: Option<String>,
}

impl Criterion {
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_rating: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            user_rating: clamp_importance(user_rating),
            tooltip_description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip_description = Some(tooltip.to_string());
        self
    }

    pub fn set_rating(&mut self, rating: u8) {
        self.user_rating = clamp_importance(rating);
    }
}

pub fn clamp_importance(rating: u8) -> u8 {
    rating.clamp(MIN_IMPORTANCE, MAX_RATING)
}

fn deserialize_importance<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = u8::deserialize(deserializer)?;
    Ok(clamp_importance(raw))
}

/// `criterion=rating` pair as typed on the command line or in config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingAssignment {
    pub criterion: String,
    pub rating: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingParseError {
    #[error("expected <criterion>=<rating>, got: {0}")]
    MissingSeparator(String),
    #[error("criterion name is empty in: {0}")]
    EmptyCriterion(String),
    #[error("rating must be an integer between 1 and 5, got: {0}")]
    OutOfRange(String),
}

impl FromStr for RatingAssignment {
    type Err = RatingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((criterion, rating)) = s.split_once('=') else {
            return Err(RatingParseError::MissingSeparator(s.to_string()));
        };
        let criterion = criterion.trim();
        if criterion.is_empty() {
            return Err(RatingParseError::EmptyCriterion(s.to_string()));
        }
        let rating = rating
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|r| (MIN_IMPORTANCE..=MAX_RATING).contains(r))
            .ok_or_else(|| RatingParseError::OutOfRange(rating.trim().to_string()))?;
        Ok(Self {
            criterion: criterion.to_string(),
            rating,
        })
    }
}
