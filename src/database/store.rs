use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::error::Result;
use crate::models::candidate::Candidate;
use crate::models::exam_status::ExamStatus;

/// Addresses a candidate either by primary key or by exam id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKey {
    Id(Uuid),
    ExamId(String),
}

impl CandidateKey {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        match self {
            CandidateKey::Id(id) => candidate.id == *id,
            CandidateKey::ExamId(exam_id) => candidate.exam_id == *exam_id,
        }
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKey::Id(id) => write!(f, "candidate {}", id),
            CandidateKey::ExamId(exam_id) => write!(f, "exam {}", exam_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub status: Option<ExamStatus>,
    /// Case-insensitive match on name, email or exam id.
    pub search: Option<String>,
}

impl CandidateFilter {
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        if let Some(status) = self.status {
            if candidate.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                candidate.full_name.to_lowercase().contains(&term)
                    || candidate.email.to_lowercase().contains(&term)
                    || candidate.exam_id.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// A change applied to one locked candidate record. Returning an error
/// aborts the update and nothing is written.
pub type Mutation<'a> = Box<dyn FnOnce(&mut Candidate) -> Result<()> + Send + 'a>;

/// Durable home of candidate records.
///
/// Every state change goes through [`CandidateStore::modify`], which loads,
/// mutates, validates and writes a single record as one atomic step.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert(&self, candidate: Candidate) -> Result<Candidate>;

    async fn find(&self, key: &CandidateKey) -> Result<Option<Candidate>>;

    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>>;

    async fn modify<'a>(&self, key: &CandidateKey, mutation: Mutation<'a>) -> Result<Candidate>;

    async fn delete(&self, id: Uuid) -> Result<Option<Candidate>>;

    /// Atomically bumps and returns the exam id sequence for `year`.
    async fn next_exam_sequence(&self, year: i32) -> Result<u32>;
}
