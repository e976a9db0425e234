pub mod evaluator;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::schema::{MAX_RATING, MIN_IMPORTANCE};

pub use evaluator::{filter_catalog, filter_ranked, filter_tools, matches_conditions};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConditionType {
    Methodology,
    Criteria,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
}

impl Comparison {
    pub fn apply(self, left: u8, right: u8) -> bool {
        match self {
            Self::Greater => left > right,
            Self::GreaterOrEqual => left >= right,
            Self::Equal => left == right,
            Self::LessOrEqual => left <= right,
            Self::Less => left < right,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "=",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("unknown comparison operator: {0}")]
    UnknownOperator(String),
    #[error("unknown filter mode: {0} (expected AND or OR)")]
    UnknownMode(String),
    #[error("expected <criterion><op><rating>, got: {0}")]
    MalformedExpression(String),
}

impl FromStr for Comparison {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" => Ok(Self::Greater),
            ">=" | "gte" => Ok(Self::GreaterOrEqual),
            "=" | "==" | "eq" => Ok(Self::Equal),
            "<=" | "lte" => Ok(Self::LessOrEqual),
            "<" | "lt" => Ok(Self::Less),
            other => Err(FilterParseError::UnknownOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl FromStr for FilterMode {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" | "ALL" => Ok(Self::And),
            "OR" | "ANY" => Ok(Self::Or),
            _ => Err(FilterParseError::UnknownMode(s.to_string())),
        }
    }
}

impl Display for FilterMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// User-editable filter row. Fields fill in one at a time, so any of them may
/// be missing while the user is still composing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterCondition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConditionType,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub operator: Option<Comparison>,
    #[serde(default)]
    pub rating: Option<u8>,
}

/// A condition with every field its type needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCondition<'a> {
    Methodology(&'a str),
    Criteria {
        criterion: &'a str,
        operator: Comparison,
        threshold: u8,
    },
}

impl FilterCondition {
    pub fn methodology(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ConditionType::Methodology,
            value: Some(value.into()),
            operator: None,
            rating: None,
        }
    }

    pub fn criteria(
        id: impl Into<String>,
        criterion: impl Into<String>,
        operator: Comparison,
        rating: u8,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ConditionType::Criteria,
            value: Some(criterion.into()),
            operator: Some(operator),
            rating: Some(rating),
        }
    }

    /// Empty condition of the given type, as created by an "add filter" action.
    pub fn blank(id: impl Into<String>, kind: ConditionType) -> Self {
        Self {
            id: id.into(),
            kind,
            value: None,
            operator: None,
            rating: None,
        }
    }

    /// Parses `scalability>=4` style expressions.
    pub fn parse_criteria_expression(
        id: impl Into<String>,
        expression: &str,
    ) -> Result<Self, FilterParseError> {
        const OPERATORS: [&str; 6] = [">=", "<=", "==", ">", "<", "="];
        let malformed = || FilterParseError::MalformedExpression(expression.to_string());

        let (idx, symbol) = OPERATORS
            .iter()
            .filter_map(|op| expression.find(op).map(|idx| (idx, *op)))
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())))
            .ok_or_else(malformed)?;

        let criterion = expression[..idx].trim();
        let rating = expression[idx + symbol.len()..].trim();
        if criterion.is_empty() {
            return Err(malformed());
        }
        let operator = Comparison::from_str(symbol)?;
        let rating = rating.parse::<u8>().map_err(|_| malformed())?;
        Ok(Self::criteria(id, criterion, operator, rating))
    }

    pub fn resolve(&self) -> Option<ResolvedCondition<'_>> {
        let value = self
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())?;
        match self.kind {
            ConditionType::Methodology => Some(ResolvedCondition::Methodology(value)),
            ConditionType::Criteria => {
                let operator = self.operator?;
                let threshold = self
                    .rating
                    .filter(|r| (MIN_IMPORTANCE..=MAX_RATING).contains(r))?;
                Some(ResolvedCondition::Criteria {
                    criterion: value,
                    operator,
                    threshold,
                })
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.resolve().is_some()
    }
}

impl Display for FilterCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.resolve() {
            Some(ResolvedCondition::Methodology(value)) => write!(f, "methodology = {value}"),
            Some(ResolvedCondition::Criteria {
                criterion,
                operator,
                threshold,
            }) => write!(f, "{criterion} {operator} {threshold}"),
            None => write!(f, "{} (incomplete)", self.id),
        }
    }
}
