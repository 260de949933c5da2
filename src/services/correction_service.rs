use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{CandidateKey, CandidateStore};
use crate::error::{Error, Result};
use crate::models::band::Band;
use crate::models::candidate::{Candidate, ClientInfo};
use crate::models::exam_module::ExamModule;
use crate::models::exam_status::ExamStatus;
use crate::models::scores::WritingScore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionOverride {
    pub band: Band,
    #[serde(default)]
    pub correct_answers: Option<u32>,
}

/// Admin override of several module results in one step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreOverrides {
    #[serde(default)]
    pub listening: Option<SectionOverride>,
    #[serde(default)]
    pub reading: Option<SectionOverride>,
    #[serde(default)]
    pub writing: Option<Band>,
    #[serde(default)]
    pub remarks: Option<String>,
}

fn require_completed(candidate: &Candidate, module: ExamModule) -> Result<()> {
    if candidate.completed_modules.contains(&module) {
        Ok(())
    } else {
        Err(Error::InvalidState(format!(
            "Module {} has not been completed",
            module
        )))
    }
}

fn override_band(candidate: &mut Candidate, module: ExamModule, band: Band, correct_answers: Option<u32>) -> Result<()> {
    require_completed(candidate, module)?;
    let exam_id = candidate.exam_id.clone();
    let section = match module {
        ExamModule::Listening => candidate.scores.listening.as_mut(),
        ExamModule::Reading => candidate.scores.reading.as_mut(),
        ExamModule::Writing => {
            candidate.scores.writing = Some(WritingScore::uniform(band));
            return Ok(());
        }
    };
    let section = section
        .ok_or_else(|| Error::Internal(format!("Exam {}: {} score missing", exam_id, module)))?;
    section.band = band;
    if let Some(correct) = correct_answers {
        section.correct_answers = correct;
        section.raw = correct;
    }
    Ok(())
}

/// Administrative corrections. Every operation is one atomic update and
/// re-derives the overall band before writing.
#[derive(Clone)]
pub struct CorrectionService {
    store: Arc<dyn CandidateStore>,
}

impl CorrectionService {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    pub async fn reset_module(&self, candidate_id: Uuid, module: ExamModule) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::Id(candidate_id),
                Box::new(move |c: &mut Candidate| {
                    require_completed(c, module)?;
                    c.completed_modules.remove(&module);
                    c.scores.clear(module);
                    c.answers.clear(module);

                    let next = if c.completed_modules.is_empty() {
                        ExamStatus::NotStarted
                    } else {
                        ExamStatus::InProgress
                    };
                    c.transition(next)?;
                    c.completed_at = None;
                    c.scores.recompute_overall();
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            exam_id = %candidate.exam_id,
            module = %module,
            status = %candidate.status,
            "Admin reset module"
        );
        Ok(candidate)
    }

    /// Returns the candidate to a clean `not_started` state with a retake granted.
    pub async fn reset_exam(&self, exam_id: &str) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::ExamId(exam_id.trim().to_string()),
                Box::new(|c: &mut Candidate| {
                    c.transition(ExamStatus::NotStarted)?;
                    c.session_id = None;
                    c.started_at = None;
                    c.completed_at = None;
                    c.client = ClientInfo::default();
                    c.completed_modules.clear();
                    c.scores = Default::default();
                    c.answers = Default::default();
                    c.violations.clear();
                    c.total_violations = 0;
                    c.results_published = false;
                    c.may_retake = true;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(exam_id = %candidate.exam_id, "Admin reset exam");
        Ok(candidate)
    }

    /// Toggles result visibility. Publishing closes a running exam.
    pub async fn publish(&self, candidate_id: Uuid, publish: bool) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::Id(candidate_id),
                Box::new(move |c: &mut Candidate| {
                    if publish && c.status != ExamStatus::Completed {
                        c.transition(ExamStatus::Completed)?;
                    }
                    if publish && c.completed_at.is_none() {
                        c.completed_at = Some(Utc::now());
                    }
                    c.results_published = publish;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            exam_id = %candidate.exam_id,
            published = candidate.results_published,
            "Result visibility changed"
        );
        Ok(candidate)
    }

    pub async fn update_score(&self, candidate_id: Uuid, module: ExamModule, band: Band) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::Id(candidate_id),
                Box::new(move |c: &mut Candidate| {
                    override_band(c, module, band, None)?;
                    c.scores.recompute_overall();
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            exam_id = %candidate.exam_id,
            module = %module,
            band = %band,
            overall = ?candidate.scores.overall,
            "Admin updated module band"
        );
        Ok(candidate)
    }

    /// Leaves completed modules and answer traces untouched.
    pub async fn update_all_scores(&self, candidate_id: Uuid, overrides: ScoreOverrides) -> Result<Candidate> {
        let candidate = self
            .store
            .modify(
                &CandidateKey::Id(candidate_id),
                Box::new(move |c: &mut Candidate| {
                    if let Some(listening) = overrides.listening {
                        override_band(c, ExamModule::Listening, listening.band, listening.correct_answers)?;
                    }
                    if let Some(reading) = overrides.reading {
                        override_band(c, ExamModule::Reading, reading.band, reading.correct_answers)?;
                    }
                    if let Some(writing) = overrides.writing {
                        override_band(c, ExamModule::Writing, writing, None)?;
                    }
                    if let Some(remarks) = overrides.remarks {
                        c.admin_remarks = Some(remarks).filter(|r| !r.trim().is_empty());
                    }
                    c.scores.recompute_overall();
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            exam_id = %candidate.exam_id,
            overall = ?candidate.scores.overall,
            "Admin updated scores"
        );
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryCandidateStore;
    use crate::models::answer::{ModuleAnswers, WritingResponse};
    use crate::models::candidate::{NewCandidate, TestAssignment};
    use crate::models::scores::{Scores, SectionScore};

    fn band(value: f64) -> Band {
        Band::new(value).unwrap()
    }

    /// Candidate with all three modules on record and a completed exam.
    async fn completed_candidate(store: &MemoryCandidateStore) -> Candidate {
        let mut candidate = Candidate::new(
            "EX20260002".into(),
            NewCandidate {
                full_name: "Bob".into(),
                email: "bob@example.com".into(),
                phone: None,
                is_active: true,
                payment_confirmed: true,
                assignment: TestAssignment::default(),
            },
            None,
        );
        for (module, value) in [(ExamModule::Listening, 6.0), (ExamModule::Reading, 7.0)] {
            let score = SectionScore {
                raw: 30,
                band: band(value),
                correct_answers: 30,
                total_questions: 40,
            };
            match module {
                ExamModule::Listening => candidate.scores.listening = Some(score),
                _ => candidate.scores.reading = Some(score),
            }
            candidate.answers.set(module, ModuleAnswers::Objective(Vec::new()));
            candidate.completed_modules.insert(module);
        }
        candidate.scores.writing = Some(WritingScore::uniform(band(7.0)));
        candidate
            .answers
            .set(ExamModule::Writing, ModuleAnswers::Writing(WritingResponse::default()));
        candidate.completed_modules.insert(ExamModule::Writing);
        candidate.status = ExamStatus::Completed;
        candidate.completed_at = Some(Utc::now());
        candidate.scores.recompute_overall();
        store.insert(candidate).await.unwrap()
    }

    #[tokio::test]
    async fn reset_module_reopens_the_exam() {
        let store = Arc::new(MemoryCandidateStore::new());
        let candidate = completed_candidate(&store).await;
        let service = CorrectionService::new(store);

        let updated = service
            .reset_module(candidate.id, ExamModule::Writing)
            .await
            .unwrap();
        assert_eq!(updated.status, ExamStatus::InProgress);
        assert!(updated.scores.writing.is_none());
        assert!(!updated.answers.has(ExamModule::Writing));
        assert_eq!(updated.scores.overall, Some(band(6.5)));

        let err = service
            .reset_module(candidate.id, ExamModule::Writing)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn resetting_every_module_returns_to_not_started() {
        let store = Arc::new(MemoryCandidateStore::new());
        let candidate = completed_candidate(&store).await;
        let service = CorrectionService::new(store);

        for module in ExamModule::ALL {
            service.reset_module(candidate.id, module).await.unwrap();
        }
        let updated = service
            .store
            .find(&CandidateKey::Id(candidate.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ExamStatus::NotStarted);
        assert_eq!(updated.scores.overall, None);
    }

    #[tokio::test]
    async fn update_all_scores_keeps_overall_derived() {
        let store = Arc::new(MemoryCandidateStore::new());
        let candidate = completed_candidate(&store).await;
        let service = CorrectionService::new(store);

        let updated = service
            .update_all_scores(
                candidate.id,
                ScoreOverrides {
                    listening: Some(SectionOverride {
                        band: band(8.0),
                        correct_answers: Some(36),
                    }),
                    writing: Some(band(8.0)),
                    remarks: Some("Rechecked".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let listening = updated.scores.listening.unwrap();
        assert_eq!(listening.band, band(8.0));
        assert_eq!(listening.correct_answers, 36);
        assert_eq!(updated.scores.overall, Some(band(7.5)));
        assert_eq!(updated.admin_remarks.as_deref(), Some("Rechecked"));
        assert_eq!(updated.completed_modules.len(), 3);
    }

    #[tokio::test]
    async fn reset_exam_clears_everything_and_grants_retake() {
        let store = Arc::new(MemoryCandidateStore::new());
        let candidate = completed_candidate(&store).await;
        let service = CorrectionService::new(store);

        let updated = service.reset_exam(&candidate.exam_id).await.unwrap();
        assert_eq!(updated.status, ExamStatus::NotStarted);
        assert!(updated.may_retake);
        assert!(updated.completed_modules.is_empty());
        assert_eq!(updated.scores, Scores::default());
        assert_eq!(updated.total_violations, 0);
        assert!(updated.session_id.is_none());
    }

    #[tokio::test]
    async fn publishing_an_untouched_exam_is_refused() {
        let store = Arc::new(MemoryCandidateStore::new());
        let candidate = store
            .insert(Candidate::new(
                "EX20260003".into(),
                NewCandidate {
                    full_name: "Carol".into(),
                    email: "carol@example.com".into(),
                    phone: None,
                    is_active: true,
                    payment_confirmed: true,
                    assignment: TestAssignment::default(),
                },
                None,
            ))
            .await
            .unwrap();
        let service = CorrectionService::new(store);

        let err = service.publish(candidate.id, true).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let hidden = service.publish(candidate.id, false).await.unwrap();
        assert!(!hidden.results_published);
    }
}
