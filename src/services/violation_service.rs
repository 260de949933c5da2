use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::store::{CandidateKey, CandidateStore};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::exam_status::ExamStatus;
use crate::models::violation::{ViolationAction, ViolationEntry, ViolationType};

pub const TERMINATE_AT_OCCURRENCE: u32 = 3;
pub const DEDUCT_AT_OCCURRENCE: u32 = 2;

/// Escalation for the `occurrence`-th violation of one type (1-based).
pub fn escalate(violation_type: ViolationType, occurrence: u32) -> ViolationAction {
    if violation_type == ViolationType::DevTools || occurrence >= TERMINATE_AT_OCCURRENCE {
        ViolationAction::Terminated
    } else if occurrence == DEDUCT_AT_OCCURRENCE {
        ViolationAction::Deduction
    } else {
        ViolationAction::Warning
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationOutcome {
    pub action: ViolationAction,
    pub violation_count_for_type: u32,
    pub total_violations: u32,
    pub terminated: bool,
}

#[derive(Clone)]
pub struct ViolationService {
    store: Arc<dyn CandidateStore>,
}

impl ViolationService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    /// Records an integrity event against the running session and applies
    /// the escalation policy. Counting and appending happen under one lock.
    pub async fn report(&self, exam_id: &str, violation_type: ViolationType) -> Result<ViolationOutcome> {
        let key = CandidateKey::ExamId(exam_id.trim().to_string());
        let mut outcome = None;

        let candidate = self
            .store
            .modify(
                &key,
                Box::new(|c: &mut Candidate| {
                    if c.status != ExamStatus::InProgress {
                        return Err(Error::InvalidState("No active exam session".to_string()));
                    }

                    let now = Utc::now();
                    let occurrence = c.violation_count(violation_type) + 1;
                    let action = escalate(violation_type, occurrence);

                    c.violations.push(ViolationEntry {
                        violation_type,
                        occurred_at: now,
                        count: occurrence,
                        action,
                    });
                    c.total_violations += 1;

                    if action == ViolationAction::Terminated {
                        c.transition(ExamStatus::Terminated)?;
                        c.completed_at = Some(now);
                    }

                    outcome = Some(ViolationOutcome {
                        action,
                        violation_count_for_type: occurrence,
                        total_violations: c.total_violations,
                        terminated: action == ViolationAction::Terminated,
                    });
                    Ok(())
                }),
            )
            .await?;

        let outcome = outcome.ok_or_else(|| Error::Internal("Violation was not recorded".to_string()))?;

        if outcome.terminated {
            tracing::warn!(
                exam_id = %candidate.exam_id,
                violation = %violation_type,
                occurrence = outcome.violation_count_for_type,
                "Anti-cheat: exam terminated"
            );
        } else {
            tracing::info!(
                exam_id = %candidate.exam_id,
                violation = %violation_type,
                occurrence = outcome.violation_count_for_type,
                action = ?outcome.action,
                "Anti-cheat: violation recorded"
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ViolationAction::*;

    #[test]
    fn repeated_tab_switches_escalate() {
        let actions: Vec<_> = (1..=3).map(|n| escalate(ViolationType::TabSwitch, n)).collect();
        assert_eq!(actions, vec![Warning, Deduction, Terminated]);
    }

    #[test]
    fn dev_tools_terminates_immediately() {
        assert_eq!(escalate(ViolationType::DevTools, 1), Terminated);
    }

    #[test]
    fn later_occurrences_stay_terminal() {
        assert_eq!(escalate(ViolationType::FullscreenExit, 7), Terminated);
    }
}
