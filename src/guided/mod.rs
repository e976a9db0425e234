use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bumpers::BumperCoordinator;
use crate::catalog::defaults::{
    EASE_OF_USE, FLEXIBILITY, INTEGRATIONS, PORTFOLIO, REPORTING, SCALABILITY, SECURITY,
};
use crate::catalog::{canonical_key, clamp_importance, Criterion};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidedQuestion {
    pub id: String,
    pub prompt: String,
    /// Criterion ids this answer feeds into.
    pub affects: Vec<String>,
    /// Labels for answers 1 through 5.
    pub options: [String; 5],
}

impl GuidedQuestion {
    fn new(id: &str, prompt: &str, affects: &[&str], options: [&str; 5]) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            affects: affects.iter().map(|a| a.to_string()).collect(),
            options: options.map(str::to_string),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuidedError {
    #[error("unknown question: {0}")]
    UnknownQuestion(String),
    #[error("answer for {question} must be between 1 and 5, got {answer}")]
    InvalidAnswer { question: String, answer: u8 },
    #[error("no answers supplied")]
    NoAnswers,
}

/// Criterion importance after a questionnaire, with the change per criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuidedOutcome {
    pub criteria: Vec<Criterion>,
    pub changes: Vec<RatingChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingChange {
    pub criterion_id: String,
    pub from: u8,
    pub to: u8,
}

pub fn default_questions() -> Vec<GuidedQuestion> {
    vec![
        GuidedQuestion::new(
            "team_size",
            "How many people will use the tool over the next two years?",
            &[SCALABILITY],
            ["Under 10", "10-50", "50-200", "200-1000", "Over 1000"],
        ),
        GuidedQuestion::new(
            "project_volume",
            "How many concurrent projects do you run?",
            &[SCALABILITY, PORTFOLIO],
            ["1-2", "3-10", "10-25", "25-100", "Over 100"],
        ),
        GuidedQuestion::new(
            "tool_stack",
            "How many other systems must the tool connect to?",
            &[INTEGRATIONS],
            ["None", "One or two", "A handful", "Many", "Everything we run"],
        ),
        GuidedQuestion::new(
            "user_experience",
            "How much training time can your users afford?",
            &[EASE_OF_USE],
            ["Weeks", "Several days", "A day", "An hour", "None"],
        ),
        GuidedQuestion::new(
            "process_variety",
            "How different are the workflows across your teams?",
            &[FLEXIBILITY],
            ["Identical", "Minor variation", "Some variation", "Very different", "Unique per team"],
        ),
        GuidedQuestion::new(
            "portfolio_visibility",
            "How important is prioritizing work across the whole portfolio?",
            &[PORTFOLIO, REPORTING],
            ["Not at all", "Slightly", "Moderately", "Very", "Critical"],
        ),
        GuidedQuestion::new(
            "executive_reporting",
            "How often does leadership need roll-up reporting?",
            &[REPORTING],
            ["Never", "Quarterly", "Monthly", "Weekly", "Real time"],
        ),
        GuidedQuestion::new(
            "compliance",
            "What security and compliance requirements apply?",
            &[SECURITY],
            ["None", "Basic", "SSO required", "Audited", "Regulated industry"],
        ),
    ]
}

/// Applies answers (question id → 1..=5) to `criteria`. Each criterion becomes
/// the rounded mean of the answers that affect it; untouched criteria keep
/// their current importance.
pub fn apply_answers(
    criteria: &[Criterion],
    questions: &[GuidedQuestion],
    answers: &BTreeMap<String, u8>,
) -> Result<GuidedOutcome, GuidedError> {
    if answers.is_empty() {
        return Err(GuidedError::NoAnswers);
    }

    let mut sums: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for (question_id, answer) in answers {
        let question = questions
            .iter()
            .find(|q| q.id == *question_id)
            .ok_or_else(|| GuidedError::UnknownQuestion(question_id.clone()))?;
        if !(1..=5).contains(answer) {
            return Err(GuidedError::InvalidAnswer {
                question: question_id.clone(),
                answer: *answer,
            });
        }
        for criterion_id in &question.affects {
            let entry = sums.entry(canonical_key(criterion_id)).or_insert((0, 0));
            entry.0 += u32::from(*answer);
            entry.1 += 1;
        }
    }

    let mut updated = criteria.to_vec();
    let mut changes = Vec::new();
    for criterion in &mut updated {
        let Some((sum, count)) = sums.get(&canonical_key(&criterion.id)) else {
            continue;
        };
        let mean = (f64::from(*sum) / f64::from(*count)).round() as u8;
        let to = clamp_importance(mean);
        if to != criterion.user_rating {
            changes.push(RatingChange {
                criterion_id: criterion.id.clone(),
                from: criterion.user_rating,
                to,
            });
        }
        criterion.set_rating(to);
    }

    Ok(GuidedOutcome {
        criteria: updated,
        changes,
    })
}

/// Guided ranking session. Opening it suppresses every bumper; finishing it
/// arms the post-guided exit-intent quiet period. Dropping it unfinished
/// counts as abandoning it.
pub struct GuidedRankingFlow<'a> {
    coordinator: &'a mut BumperCoordinator,
    questions: Vec<GuidedQuestion>,
    answers: BTreeMap<String, u8>,
    finished: bool,
}

impl<'a> GuidedRankingFlow<'a> {
    pub fn open(coordinator: &'a mut BumperCoordinator, questions: Vec<GuidedQuestion>) -> Self {
        coordinator.mark_guided_ranking_active();
        info!("guided ranking opened with {} questions", questions.len());
        Self {
            coordinator,
            questions,
            answers: BTreeMap::new(),
            finished: false,
        }
    }

    pub fn questions(&self) -> &[GuidedQuestion] {
        &self.questions
    }

    pub fn answer(&mut self, question_id: &str, answer: u8) -> Result<(), GuidedError> {
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(GuidedError::UnknownQuestion(question_id.to_string()));
        }
        if !(1..=5).contains(&answer) {
            return Err(GuidedError::InvalidAnswer {
                question: question_id.to_string(),
                answer,
            });
        }
        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    /// Applies the answers and records completion.
    pub fn complete(mut self, criteria: &[Criterion]) -> Result<GuidedOutcome, GuidedError> {
        let outcome = apply_answers(criteria, &self.questions, &self.answers);
        match &outcome {
            Ok(result) => {
                info!(
                    "guided ranking completed, {} criteria changed",
                    result.changes.len()
                );
                self.coordinator.mark_guided_ranking_completed();
            }
            Err(_) => self.coordinator.mark_guided_ranking_inactive(),
        }
        self.finished = true;
        outcome
    }

    /// Closes without applying anything.
    pub fn abandon(mut self) {
        self.coordinator.mark_guided_ranking_inactive();
        self.finished = true;
    }
}

impl Drop for GuidedRankingFlow<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("guided ranking dropped without finishing");
            self.coordinator.mark_guided_ranking_inactive();
        }
    }
}
