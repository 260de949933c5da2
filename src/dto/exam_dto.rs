use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::band::Band;
use crate::models::violation::ViolationType;
use crate::services::grading_service::SubmittedAnswer;
use crate::services::score_service::ModuleSubmission;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyExamRequest {
    #[validate(length(min = 1, max = 32))]
    pub exam_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartExamRequest {
    #[validate(length(min = 1, max = 32))]
    pub exam_id: String,
    #[validate(length(max = 256))]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportViolationRequest {
    pub violation_type: ViolationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveModuleScoreRequest {
    pub band: Band,
    pub raw_score: Option<u32>,
    pub total_questions: Option<u32>,
    #[validate(length(max = 200))]
    pub answers: Option<Vec<SubmittedAnswer>>,
    #[validate(length(max = 20000))]
    pub task1: Option<String>,
    #[validate(length(max = 20000))]
    pub task2: Option<String>,
}

impl From<SaveModuleScoreRequest> for ModuleSubmission {
    fn from(req: SaveModuleScoreRequest) -> Self {
        Self {
            band: req.band,
            raw_score: req.raw_score,
            total_questions: req.total_questions,
            answers: req.answers,
            task1: req.task1,
            task2: req.task2,
        }
    }
}
