use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::store::{CandidateKey, CandidateStore};
use crate::error::{Error, Result};
use crate::models::answer::{AnswerRecord, ModuleAnswers, WritingResponse};
use crate::models::band::Band;
use crate::models::candidate::Candidate;
use crate::models::exam_module::ExamModule;
use crate::models::exam_status::ExamStatus;
use crate::models::scores::{Scores, SectionScore, WritingScore};
use crate::services::grading_service::{GradingMode, GradingService, SubmittedAnswer};
use crate::services::session_service::INVALID_EXAM_ID;
use crate::services::test_bank::TestBank;

/// What the exam client sends when a module ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSubmission {
    pub band: Band,
    #[serde(default)]
    pub raw_score: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub answers: Option<Vec<SubmittedAnswer>>,
    #[serde(default)]
    pub task1: Option<String>,
    #[serde(default)]
    pub task2: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResult {
    pub module: ExamModule,
    pub band: Band,
    pub completed_modules: Vec<ExamModule>,
    pub all_completed: bool,
    pub scores: Scores,
    pub grading: GradingMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionBand {
    pub band: Band,
    #[serde(default)]
    pub raw_score: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
}

/// Client-side scores for every module at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkCompletion {
    #[serde(default)]
    pub listening: Option<SectionBand>,
    #[serde(default)]
    pub reading: Option<SectionBand>,
    #[serde(default)]
    pub writing: Option<Band>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub status: ExamStatus,
    pub completed_modules: Vec<ExamModule>,
    pub scores: Scores,
}

/// A graded module, ready to be committed.
#[derive(Debug, Clone)]
enum GradedModule {
    Section(SectionScore, Vec<AnswerRecord>),
    Writing(WritingScore, WritingResponse),
}

impl GradedModule {
    fn apply(self, module: ExamModule, candidate: &mut Candidate) {
        match self {
            GradedModule::Section(score, records) => {
                match module {
                    ExamModule::Listening => candidate.scores.listening = Some(score),
                    ExamModule::Reading => candidate.scores.reading = Some(score),
                    ExamModule::Writing => {}
                }
                candidate.answers.set(module, ModuleAnswers::Objective(records));
            }
            GradedModule::Writing(score, response) => {
                candidate.scores.writing = Some(score);
                candidate.answers.set(module, ModuleAnswers::Writing(response));
            }
        }
    }
}

/// Rejects saves for modules already on record or for closed sessions.
fn ensure_module_open(candidate: &Candidate, module: ExamModule) -> Result<()> {
    if candidate.completed_modules.contains(&module) {
        return Err(Error::Conflict(format!("Module {} already completed", module)));
    }
    if matches!(candidate.status, ExamStatus::Terminated | ExamStatus::Expired) {
        return Err(Error::InvalidState(format!("Exam session is {}", candidate.status)));
    }
    Ok(())
}

/// Re-derives status after the completed-module set has grown.
fn advance_status(candidate: &mut Candidate) -> Result<()> {
    if candidate.all_modules_completed() && candidate.status != ExamStatus::Completed {
        candidate.transition(ExamStatus::Completed)?;
        candidate.completed_at = Some(Utc::now());
    } else if candidate.status == ExamStatus::NotStarted {
        candidate.transition(ExamStatus::InProgress)?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct ScoreService {
    store: Arc<dyn CandidateStore>,
    test_bank: Arc<dyn TestBank>,
}

impl ScoreService {
    pub fn new(store: Arc<dyn CandidateStore>, test_bank: Arc<dyn TestBank>) -> Self {
        Self { store, test_bank }
    }

    /// Grades and commits one module. The score, the answer trace and the
    /// completed-module entry land in a single atomic update.
    pub async fn save(
        &self,
        exam_id: &str,
        module: ExamModule,
        submission: ModuleSubmission,
    ) -> Result<SaveResult> {
        let key = CandidateKey::ExamId(exam_id.trim().to_string());
        let candidate = self
            .store
            .find(&key)
            .await?
            .ok_or_else(|| Error::NotFound(INVALID_EXAM_ID.to_string()))?;

        // Cheap rejection before the Test Bank round trip; re-checked under lock.
        ensure_module_open(&candidate, module)?;

        let band = submission.band;
        let (graded, grading) = self.grade(&candidate, module, &submission).await;

        let updated = self
            .store
            .modify(
                &key,
                Box::new(move |c: &mut Candidate| {
                    ensure_module_open(c, module)?;
                    c.completed_modules.insert(module);
                    graded.apply(module, c);
                    advance_status(c)?;
                    c.scores.recompute_overall();
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            exam_id = %updated.exam_id,
            module = %module,
            band = %band,
            grading = ?grading,
            completed = updated.completed_modules.len(),
            status = %updated.status,
            "Module score saved"
        );

        Ok(SaveResult {
            module,
            band,
            all_completed: updated.all_modules_completed(),
            completed_modules: updated.completed_modules.into_iter().collect(),
            scores: updated.scores,
            grading,
        })
    }

    async fn grade(
        &self,
        candidate: &Candidate,
        module: ExamModule,
        submission: &ModuleSubmission,
    ) -> (GradedModule, GradingMode) {
        if !module.is_objective() {
            let response = WritingResponse {
                task1: submission.task1.clone().unwrap_or_default(),
                task2: submission.task2.clone().unwrap_or_default(),
            };
            return (
                GradedModule::Writing(WritingScore::uniform(submission.band), response),
                GradingMode::Unverified,
            );
        }

        let answers = match submission.answers.as_deref() {
            Some(answers) if !answers.is_empty() => answers,
            _ => {
                let raw = submission.raw_score.unwrap_or(0);
                let score = SectionScore {
                    raw,
                    band: submission.band,
                    correct_answers: raw,
                    total_questions: submission.total_questions.unwrap_or(0).max(raw),
                };
                return (GradedModule::Section(score, Vec::new()), GradingMode::Unverified);
            }
        };

        let key = match candidate.assignment.for_module(module) {
            Some(set) => self.test_bank.answer_key(module, set.set_number).await,
            None => Err(Error::GradingSourceUnavailable(format!(
                "No {} test set assigned",
                module
            ))),
        };
        let key = match key {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(
                    exam_id = %candidate.exam_id,
                    module = %module,
                    error = %e,
                    "Answer key unavailable, trusting client correctness flags"
                );
                None
            }
        };

        let reconciliation = GradingService::reconcile(answers, key.as_ref());
        if let Some(claimed) = submission.raw_score {
            if claimed != reconciliation.correct {
                tracing::warn!(
                    exam_id = %candidate.exam_id,
                    module = %module,
                    claimed,
                    recomputed = reconciliation.correct,
                    "Client raw score disagrees with reconciliation"
                );
            }
        }

        // A non-empty key fixes the total; otherwise it never drops below the count.
        let total_questions = match key.as_ref().map(|k| k.len() as u32).filter(|n| *n > 0) {
            Some(key_size) => key_size,
            None => submission
                .total_questions
                .unwrap_or(reconciliation.records.len() as u32)
                .max(reconciliation.correct),
        };

        let score = SectionScore {
            raw: reconciliation.correct,
            band: submission.band,
            correct_answers: reconciliation.correct,
            total_questions,
        };
        (
            GradedModule::Section(score, reconciliation.records),
            reconciliation.mode,
        )
    }

    /// Commits client-scored bands for every supplied module and closes the exam.
    /// Modules already on record keep their server-side results.
    pub async fn complete_exam(&self, exam_id: &str, completion: BulkCompletion) -> Result<CompletionResult> {
        let key = CandidateKey::ExamId(exam_id.trim().to_string());

        let updated = self
            .store
            .modify(
                &key,
                Box::new(move |c: &mut Candidate| {
                    match c.status {
                        ExamStatus::InProgress => {}
                        ExamStatus::Completed => {
                            return Err(Error::Conflict("Exam already completed".to_string()))
                        }
                        other => {
                            return Err(Error::InvalidState(format!(
                                "Cannot complete an exam that is {}",
                                other
                            )))
                        }
                    }

                    let sections = [
                        (ExamModule::Listening, completion.listening),
                        (ExamModule::Reading, completion.reading),
                    ];
                    for (module, section) in sections {
                        let Some(section) = section else { continue };
                        if c.completed_modules.contains(&module) {
                            continue;
                        }
                        let raw = section.raw_score.unwrap_or(0);
                        let score = SectionScore {
                            raw,
                            band: section.band,
                            correct_answers: raw,
                            total_questions: section.total_questions.unwrap_or(0).max(raw),
                        };
                        c.completed_modules.insert(module);
                        GradedModule::Section(score, Vec::new()).apply(module, c);
                    }

                    if let Some(band) = completion.writing {
                        if !c.completed_modules.contains(&ExamModule::Writing) {
                            c.completed_modules.insert(ExamModule::Writing);
                            GradedModule::Writing(WritingScore::uniform(band), WritingResponse::default())
                                .apply(ExamModule::Writing, c);
                        }
                    }

                    c.transition(ExamStatus::Completed)?;
                    c.completed_at = Some(Utc::now());
                    c.scores.recompute_overall();
                    Ok(())
                }),
            )
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(INVALID_EXAM_ID.to_string()),
                other => other,
            })?;

        tracing::info!(
            exam_id = %updated.exam_id,
            overall = ?updated.scores.overall,
            "Exam completed"
        );

        Ok(CompletionResult {
            status: updated.status,
            completed_modules: updated.completed_modules.into_iter().collect(),
            scores: updated.scores,
        })
    }
}
