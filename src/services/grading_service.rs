use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::answer::{AnswerKey, AnswerRecord};

/// How far the server could check a module submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    /// Every answer was checked against the canonical key.
    Verified,
    /// The key could not be fetched; client correctness flags were used.
    Degraded,
    /// No per-question answers were submitted.
    Unverified,
}

/// A single answer as the exam client submits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_number: u32,
    #[serde(default)]
    pub answer: String,
    /// The client's own verdict. Only consulted in degraded mode.
    #[serde(default)]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub records: Vec<AnswerRecord>,
    pub correct: u32,
    pub mode: GradingMode,
}

pub struct GradingService;

impl GradingService {
    pub fn normalize(value: &str) -> String {
        value.trim().to_lowercase()
    }

    /// Re-grades submitted answers. With a key, correctness is membership of
    /// the normalized answer among the normalized alternates; without one the
    /// client's flags stand. Blank answers are never correct. Only the first
    /// answer to each question number is graded; repeats are dropped.
    pub fn reconcile(submitted: &[SubmittedAnswer], key: Option<&AnswerKey>) -> Reconciliation {
        let mut records = Vec::with_capacity(submitted.len());
        let mut seen = HashSet::with_capacity(submitted.len());
        let mut correct = 0;

        for answer in submitted {
            if !seen.insert(answer.question_number) {
                continue;
            }
            let normalized = Self::normalize(&answer.answer);
            let canonical = key.and_then(|k| k.get(&answer.question_number)).cloned();

            let is_correct = if normalized.is_empty() {
                false
            } else if key.is_some() {
                canonical
                    .as_ref()
                    .map(|c| c.alternates().iter().any(|alt| Self::normalize(alt) == normalized))
                    .unwrap_or(false)
            } else {
                answer.is_correct.unwrap_or(false)
            };

            if is_correct {
                correct += 1;
            }
            records.push(AnswerRecord {
                question_number: answer.question_number,
                submitted: answer.answer.clone(),
                normalized,
                canonical,
                is_correct,
            });
        }

        Reconciliation {
            records,
            correct,
            mode: if key.is_some() {
                GradingMode::Verified
            } else {
                GradingMode::Degraded
            },
        }
    }
}
