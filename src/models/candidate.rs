use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::answer::AnswerSheet;
use super::exam_module::ExamModule;
use super::exam_status::ExamStatus;
use super::scores::Scores;
use super::violation::{ViolationEntry, ViolationType};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedSet {
    pub test_id: Uuid,
    pub set_number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAssignment {
    #[serde(default)]
    pub listening: Option<AssignedSet>,
    #[serde(default)]
    pub reading: Option<AssignedSet>,
    #[serde(default)]
    pub writing: Option<AssignedSet>,
}

impl TestAssignment {
    pub fn for_module(&self, module: ExamModule) -> Option<AssignedSet> {
        match module {
            ExamModule::Listening => self.listening,
            ExamModule::Reading => self.reading,
            ExamModule::Writing => self.writing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub exam_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub payment_confirmed: bool,
    pub may_retake: bool,
    pub assignment: TestAssignment,
    pub status: ExamStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub client: ClientInfo,
    pub completed_modules: BTreeSet<ExamModule>,
    pub scores: Scores,
    pub answers: AnswerSheet,
    pub violations: Vec<ViolationEntry>,
    pub total_violations: u32,
    pub results_published: bool,
    pub admin_remarks: Option<String>,
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything an admin supplies when registering a candidate.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub payment_confirmed: bool,
    pub assignment: TestAssignment,
}

impl Candidate {
    pub fn new(exam_id: String, data: NewCandidate, account_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            exam_id,
            full_name: data.full_name,
            email: data.email,
            phone: data.phone,
            is_active: data.is_active,
            payment_confirmed: data.payment_confirmed,
            may_retake: false,
            assignment: data.assignment,
            status: ExamStatus::NotStarted,
            session_id: None,
            started_at: None,
            completed_at: None,
            client: ClientInfo::default(),
            completed_modules: BTreeSet::new(),
            scores: Scores::default(),
            answers: AnswerSheet::default(),
            violations: Vec::new(),
            total_violations: 0,
            results_published: false,
            admin_remarks: None,
            account_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves to `next` if the session state machine allows it.
    pub fn transition(&mut self, next: ExamStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "Cannot move exam {} from {} to {}",
                self.exam_id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn violation_count(&self, violation_type: ViolationType) -> u32 {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .count() as u32
    }

    pub fn all_modules_completed(&self) -> bool {
        self.completed_modules.len() == ExamModule::ALL.len()
    }

    /// Record-level invariants, checked before every write.
    pub fn check_invariants(&self) -> Result<()> {
        for module in ExamModule::ALL {
            let completed = self.completed_modules.contains(&module);
            if self.scores.has(module) != completed || self.answers.has(module) != completed {
                return Err(Error::Internal(format!(
                    "Exam {}: {} score/answers out of step with completed modules",
                    self.exam_id, module
                )));
            }
        }

        let expected_overall = crate::services::aggregation::compute_overall(&self.scores.module_bands());
        if self.scores.overall != expected_overall {
            return Err(Error::Internal(format!(
                "Exam {}: overall band is not derived from module bands",
                self.exam_id
            )));
        }

        if self.total_violations < self.violations.len() as u32 {
            return Err(Error::Internal(format!(
                "Exam {}: violation counter behind the violation log",
                self.exam_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::band::Band;
    use crate::models::scores::WritingScore;

    fn sample() -> Candidate {
        Candidate::new(
            "EX20260001".into(),
            NewCandidate {
                full_name: "Alice".into(),
                email: "alice@example.com".into(),
                phone: None,
                is_active: true,
                payment_confirmed: true,
                assignment: TestAssignment::default(),
            },
            None,
        )
    }

    #[test]
    fn fresh_candidate_satisfies_invariants() {
        sample().check_invariants().unwrap();
    }

    #[test]
    fn score_without_membership_is_rejected() {
        let mut candidate = sample();
        candidate.scores.writing = Some(WritingScore::uniform(Band::new(6.0).unwrap()));
        candidate.scores.recompute_overall();
        assert!(candidate.check_invariants().is_err());
    }

    #[test]
    fn hand_set_overall_is_rejected() {
        let mut candidate = sample();
        candidate.scores.overall = Some(Band::new(7.0).unwrap());
        assert!(candidate.check_invariants().is_err());
    }

    #[test]
    fn illegal_transition_is_refused() {
        let mut candidate = sample();
        let err = candidate.transition(ExamStatus::Completed).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(candidate.status, ExamStatus::NotStarted);
    }
}
