use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{CandidateFilter, CandidateKey, CandidateStore};
use crate::error::{Error, Result};
use crate::models::answer::ModuleAnswers;
use crate::models::band::Band;
use crate::models::candidate::{Candidate, NewCandidate, TestAssignment};
use crate::models::exam_module::ExamModule;
use crate::models::exam_status::ExamStatus;
use crate::services::account_service::{AccountService, IssuedAccount};
use crate::utils::exam_id::allocate_exam_id;

/// Partial profile update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub payment_confirmed: Option<bool>,
    pub may_retake: Option<bool>,
    pub assignment: Option<TestAssignment>,
    pub admin_remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedCandidate {
    pub candidate: Candidate,
    pub account: IssuedAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSheetView {
    pub exam_id: String,
    pub module: ExamModule,
    pub band: Option<Band>,
    pub answers: ModuleAnswers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub terminated: usize,
    pub expired: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: ExamStatus) {
        let slot = match status {
            ExamStatus::NotStarted => &mut self.not_started,
            ExamStatus::InProgress => &mut self.in_progress,
            ExamStatus::Completed => &mut self.completed,
            ExamStatus::Terminated => &mut self.terminated,
            ExamStatus::Expired => &mut self.expired,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleAverages {
    pub listening: Option<f64>,
    pub reading: Option<f64>,
    pub writing: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamStatistics {
    pub total_candidates: usize,
    pub by_status: StatusCounts,
    pub published: usize,
    pub average_overall: Option<f64>,
    pub average_bands: ModuleAverages,
    pub total_violations: u64,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Aggregate counts and averages. Zero bands are left out of the averages.
pub fn compute_statistics(candidates: &[Candidate]) -> ExamStatistics {
    let mut stats = ExamStatistics {
        total_candidates: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        stats.by_status.bump(candidate.status);
        if candidate.results_published {
            stats.published += 1;
        }
        stats.total_violations += u64::from(candidate.total_violations);
    }

    let nonzero = |band: Option<Band>| band.filter(|b| !b.is_zero()).map(f64::from);
    stats.average_overall = mean(candidates.iter().filter_map(|c| nonzero(c.scores.overall)));
    stats.average_bands = ModuleAverages {
        listening: mean(candidates.iter().filter_map(|c| nonzero(c.scores.band_of(ExamModule::Listening)))),
        reading: mean(candidates.iter().filter_map(|c| nonzero(c.scores.band_of(ExamModule::Reading)))),
        writing: mean(candidates.iter().filter_map(|c| nonzero(c.scores.band_of(ExamModule::Writing)))),
    };
    stats
}

/// Admin-side candidate management.
#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn CandidateStore>,
    accounts: Arc<dyn AccountService>,
}

impl CandidateService {
    pub fn new(store: Arc<dyn CandidateStore>, accounts: Arc<dyn AccountService>) -> Self {
        Self { store, accounts }
    }

    /// Allocates an exam id, issues the login account and stores the record.
    pub async fn create(&self, data: NewCandidate) -> Result<CreatedCandidate> {
        let exam_id = allocate_exam_id(self.store.as_ref(), Utc::now().year()).await?;
        let account = self.accounts.create_account(&exam_id).await?;

        let candidate = Candidate::new(exam_id, data, Some(account.account_id));
        let candidate = match self.store.insert(candidate).await {
            Ok(candidate) => candidate,
            Err(e) => {
                if let Err(cleanup) = self.accounts.delete_account(account.account_id).await {
                    tracing::error!(
                        account_id = %account.account_id,
                        error = %cleanup,
                        "Failed to roll back account after candidate insert error"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            candidate_id = %candidate.id,
            exam_id = %candidate.exam_id,
            "Candidate registered"
        );
        Ok(CreatedCandidate { candidate, account })
    }

    pub async fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        self.store.list(filter).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate> {
        self.store
            .find(&CandidateKey::Id(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }

    pub async fn update(&self, id: Uuid, update: CandidateUpdate) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::Id(id),
                Box::new(move |c: &mut Candidate| {
                    if let Some(full_name) = update.full_name {
                        c.full_name = full_name;
                    }
                    if let Some(email) = update.email {
                        c.email = email;
                    }
                    if let Some(phone) = update.phone {
                        c.phone = Some(phone).filter(|p| !p.trim().is_empty());
                    }
                    if let Some(is_active) = update.is_active {
                        c.is_active = is_active;
                    }
                    if let Some(payment_confirmed) = update.payment_confirmed {
                        c.payment_confirmed = payment_confirmed;
                    }
                    if let Some(may_retake) = update.may_retake {
                        c.may_retake = may_retake;
                    }
                    if let Some(assignment) = update.assignment {
                        c.assignment = assignment;
                    }
                    if let Some(remarks) = update.admin_remarks {
                        c.admin_remarks = Some(remarks).filter(|r| !r.trim().is_empty());
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(candidate_id = %candidate.id, "Candidate updated");
        Ok(candidate)
    }

    /// Removes the record, then its login account.
    pub async fn delete(&self, id: Uuid) -> Result<Candidate> {
        let candidate = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;

        if let Some(account_id) = candidate.account_id {
            if let Err(e) = self.accounts.delete_account(account_id).await {
                tracing::warn!(
                    candidate_id = %candidate.id,
                    account_id = %account_id,
                    error = %e,
                    "Candidate deleted but account removal failed"
                );
            }
        }

        tracing::info!(candidate_id = %candidate.id, exam_id = %candidate.exam_id, "Candidate deleted");
        Ok(candidate)
    }

    pub async fn get_answer_sheet(&self, id: Uuid, module: ExamModule) -> Result<AnswerSheetView> {
        let candidate = self.get(id).await?;
        let answers = candidate.answers.get(module).ok_or_else(|| {
            Error::NotFound(format!("No {} answers recorded for {}", module, candidate.exam_id))
        })?;

        Ok(AnswerSheetView {
            band: candidate.scores.band_of(module),
            exam_id: candidate.exam_id,
            module,
            answers,
        })
    }

    pub async fn get_statistics(&self) -> Result<ExamStatistics> {
        let candidates = self.store.list(&CandidateFilter::default()).await?;
        Ok(compute_statistics(&candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scores::WritingScore;

    fn candidate(status: ExamStatus, writing: Option<f64>, violations: u32) -> Candidate {
        let mut c = Candidate::new(
            "EX20260001".into(),
            NewCandidate {
                full_name: "Dana".into(),
                email: "dana@example.com".into(),
                phone: None,
                is_active: true,
                payment_confirmed: true,
                assignment: TestAssignment::default(),
            },
            None,
        );
        c.status = status;
        c.total_violations = violations;
        if let Some(value) = writing {
            c.completed_modules.insert(ExamModule::Writing);
            c.scores.writing = Some(WritingScore::uniform(Band::new(value).unwrap()));
            c.scores.recompute_overall();
        }
        c
    }

    #[test]
    fn statistics_of_nothing_are_empty() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_candidates, 0);
        assert_eq!(stats.average_overall, None);
    }

    #[test]
    fn statistics_count_and_average() {
        let mut published = candidate(ExamStatus::Completed, Some(7.0), 1);
        published.results_published = true;
        let candidates = vec![
            published,
            candidate(ExamStatus::Completed, Some(6.0), 0),
            candidate(ExamStatus::Terminated, None, 3),
            candidate(ExamStatus::NotStarted, None, 0),
        ];

        let stats = compute_statistics(&candidates);
        assert_eq!(stats.total_candidates, 4);
        assert_eq!(stats.by_status.completed, 2);
        assert_eq!(stats.by_status.terminated, 1);
        assert_eq!(stats.by_status.not_started, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.total_violations, 4);
        assert_eq!(stats.average_overall, Some(6.5));
        assert_eq!(stats.average_bands.writing, Some(6.5));
        assert_eq!(stats.average_bands.listening, None);
    }
}
