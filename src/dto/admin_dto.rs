use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::database::store::CandidateFilter;
use crate::models::band::Band;
use crate::models::candidate::{Candidate, NewCandidate, TestAssignment};
use crate::models::exam_status::ExamStatus;
use crate::services::candidate_service::CandidateUpdate;
use crate::services::correction_service::{ScoreOverrides, SectionOverride};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidateRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub payment_confirmed: Option<bool>,
    #[serde(default)]
    pub assignment: TestAssignment,
}

impl From<CreateCandidateRequest> for NewCandidate {
    fn from(req: CreateCandidateRequest) -> Self {
        Self {
            full_name: req.full_name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            phone: req.phone.filter(|p| !p.trim().is_empty()),
            is_active: req.is_active.unwrap_or(true),
            payment_confirmed: req.payment_confirmed.unwrap_or(false),
            assignment: req.assignment,
        }
    }
}

/// The password is only ever returned here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCandidateResponse {
    pub candidate: Candidate,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCandidateRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub payment_confirmed: Option<bool>,
    pub may_retake: Option<bool>,
    pub assignment: Option<TestAssignment>,
    #[validate(length(max = 2000))]
    pub admin_remarks: Option<String>,
}

impl From<UpdateCandidateRequest> for CandidateUpdate {
    fn from(req: UpdateCandidateRequest) -> Self {
        Self {
            full_name: req.full_name.map(|n| n.trim().to_string()),
            email: req.email.map(|e| e.trim().to_lowercase()),
            phone: req.phone,
            is_active: req.is_active,
            payment_confirmed: req.payment_confirmed,
            may_retake: req.may_retake,
            assignment: req.assignment,
            admin_remarks: req.admin_remarks,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCandidatesQuery {
    pub status: Option<ExamStatus>,
    pub search: Option<String>,
}

impl From<ListCandidatesQuery> for CandidateFilter {
    fn from(q: ListCandidatesQuery) -> Self {
        Self {
            status: q.status,
            search: q.search,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScoreRequest {
    pub band: Band,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResultsRequest {
    pub publish: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAllScoresRequest {
    pub listening: Option<SectionOverride>,
    pub reading: Option<SectionOverride>,
    pub writing: Option<Band>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
}

impl From<UpdateAllScoresRequest> for ScoreOverrides {
    fn from(req: UpdateAllScoresRequest) -> Self {
        Self {
            listening: req.listening,
            reading: req.reading,
            writing: req.writing,
            remarks: req.remarks,
        }
    }
}
