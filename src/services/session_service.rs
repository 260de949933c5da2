use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::store::{CandidateKey, CandidateStore};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, ClientInfo, TestAssignment};
use crate::models::exam_module::ExamModule;
use crate::models::exam_status::ExamStatus;
use crate::models::scores::Scores;
use crate::utils::token::session_id_for;

pub const INVALID_EXAM_ID: &str = "Invalid Exam ID";

/// Outcome of checking whether a candidate may sit the exam right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Ineligible { reason: String, show_progress: bool },
    Resumable,
    Fresh,
}

/// Eligibility decision, evaluated in a fixed order.
pub fn assess_eligibility(candidate: &Candidate) -> Eligibility {
    let ineligible = |reason: &str, show_progress: bool| Eligibility::Ineligible {
        reason: reason.to_string(),
        show_progress,
    };

    if !candidate.is_active {
        return ineligible("This exam ID has been deactivated", false);
    }
    if !candidate.payment_confirmed {
        return ineligible("Exam payment not confirmed", false);
    }
    match candidate.status {
        ExamStatus::Completed if !candidate.may_retake => ineligible("Exam already completed", true),
        ExamStatus::Terminated => ineligible("Exam terminated due to violations", false),
        ExamStatus::Expired => ineligible("Exam session has expired", false),
        ExamStatus::InProgress if candidate.session_id.is_some() => Eligibility::Resumable,
        _ => Eligibility::Fresh,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    pub resumable: bool,
    pub exam_id: String,
    pub candidate_name: Option<String>,
    pub status: Option<ExamStatus>,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub assignment: Option<TestAssignment>,
    pub completed_modules: Vec<ExamModule>,
    pub scores: Option<Scores>,
}

impl VerificationResult {
    fn unknown(exam_id: &str) -> Self {
        Self {
            valid: false,
            message: INVALID_EXAM_ID.to_string(),
            resumable: false,
            exam_id: exam_id.to_string(),
            candidate_name: None,
            status: None,
            session_id: None,
            started_at: None,
            assignment: None,
            completed_modules: Vec::new(),
            scores: None,
        }
    }

    fn for_candidate(candidate: &Candidate) -> Self {
        let base = Self {
            valid: false,
            message: String::new(),
            resumable: false,
            exam_id: candidate.exam_id.clone(),
            candidate_name: Some(candidate.full_name.clone()),
            status: Some(candidate.status),
            session_id: None,
            started_at: None,
            assignment: None,
            completed_modules: Vec::new(),
            scores: None,
        };

        match assess_eligibility(candidate) {
            Eligibility::Ineligible { reason, show_progress } => Self {
                message: reason,
                completed_modules: if show_progress {
                    candidate.completed_modules.iter().copied().collect()
                } else {
                    Vec::new()
                },
                scores: (show_progress && candidate.results_published).then(|| candidate.scores.clone()),
                ..base
            },
            Eligibility::Resumable => Self {
                valid: true,
                resumable: true,
                message: "Exam in progress, session can be resumed".to_string(),
                session_id: candidate.session_id.clone(),
                started_at: candidate.started_at,
                assignment: Some(candidate.assignment.clone()),
                completed_modules: candidate.completed_modules.iter().copied().collect(),
                ..base
            },
            Eligibility::Fresh => Self {
                valid: true,
                message: "Exam ID verified".to_string(),
                assignment: Some(candidate.assignment.clone()),
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub exam_id: String,
    pub candidate_name: String,
    pub status: ExamStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub assignment: TestAssignment,
    pub completed_modules: Vec<ExamModule>,
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResults {
    pub exam_id: String,
    pub candidate_name: String,
    pub status: ExamStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_modules: Vec<ExamModule>,
    pub published: bool,
    /// Withheld until an admin publishes the results.
    pub scores: Option<Scores>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn CandidateStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    pub async fn verify(&self, exam_id: &str) -> Result<VerificationResult> {
        let candidate = self
            .store
            .find(&CandidateKey::ExamId(exam_id.trim().to_string()))
            .await?;

        Ok(match candidate {
            Some(candidate) => VerificationResult::for_candidate(&candidate),
            None => VerificationResult::unknown(exam_id),
        })
    }

    /// Starts a fresh session, or hands back the running one unchanged.
    pub async fn start(
        &self,
        exam_id: &str,
        ip: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<SessionInfo> {
        let key = CandidateKey::ExamId(exam_id.trim().to_string());
        let mut resumed = false;

        let candidate = self
            .store
            .modify(
                &key,
                Box::new(|c: &mut Candidate| match assess_eligibility(c) {
                    Eligibility::Ineligible { reason, .. } => Err(Error::Ineligible(reason)),
                    Eligibility::Resumable => {
                        resumed = true;
                        Ok(())
                    }
                    Eligibility::Fresh => {
                        let now = Utc::now();
                        c.transition(ExamStatus::InProgress)?;
                        c.started_at = Some(now);
                        c.completed_at = None;
                        c.client = ClientInfo { ip, fingerprint };
                        c.may_retake = false;
                        c.session_id = Some(session_id_for(&c.exam_id, now));
                        Ok(())
                    }
                }),
            )
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(INVALID_EXAM_ID.to_string()),
                other => other,
            })?;

        if resumed {
            tracing::info!(exam_id = %candidate.exam_id, "Resuming exam session");
        } else {
            tracing::info!(
                exam_id = %candidate.exam_id,
                session_id = ?candidate.session_id,
                "Exam session started"
            );
        }

        Ok(SessionInfo {
            session_id: candidate.session_id.clone().unwrap_or_default(),
            exam_id: candidate.exam_id,
            candidate_name: candidate.full_name,
            status: candidate.status,
            started_at: candidate.started_at,
            assignment: candidate.assignment,
            completed_modules: candidate.completed_modules.into_iter().collect(),
            resumed,
        })
    }

    pub async fn get_results(&self, exam_id: &str) -> Result<ExamResults> {
        let candidate = self
            .store
            .find(&CandidateKey::ExamId(exam_id.trim().to_string()))
            .await?
            .ok_or_else(|| Error::NotFound(INVALID_EXAM_ID.to_string()))?;

        match candidate.status {
            ExamStatus::Completed => {}
            ExamStatus::InProgress => {
                return Err(Error::InvalidState("Exam is still in progress".to_string()))
            }
            _ => return Err(Error::InvalidState("Exam has not been completed".to_string())),
        }

        let published = candidate.results_published;
        Ok(ExamResults {
            exam_id: candidate.exam_id,
            candidate_name: candidate.full_name,
            status: candidate.status,
            completed_at: candidate.completed_at,
            completed_modules: candidate.completed_modules.into_iter().collect(),
            published,
            scores: published.then_some(candidate.scores),
            remarks: if published { candidate.admin_remarks } else { None },
        })
    }
}
