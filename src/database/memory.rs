use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::store::{CandidateFilter, CandidateKey, CandidateStore, Mutation};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;

#[derive(Debug, Default)]
struct Tables {
    candidates: HashMap<Uuid, Candidate>,
    exam_sequences: HashMap<i32, u32>,
}

/// Process-local store. A single mutex guards every record, so each
/// `modify` runs as one critical section.
#[derive(Clone, Debug, Default)]
pub struct MemoryCandidateStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("candidate store mutex poisoned")
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn insert(&self, candidate: Candidate) -> Result<Candidate> {
        candidate.check_invariants()?;
        let mut tables = self.lock();
        if tables
            .candidates
            .values()
            .any(|c| c.exam_id == candidate.exam_id)
        {
            return Err(Error::Conflict(format!(
                "Exam ID {} is already taken",
                candidate.exam_id
            )));
        }
        tables.candidates.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn find(&self, key: &CandidateKey) -> Result<Option<Candidate>> {
        let tables = self.lock();
        Ok(tables.candidates.values().find(|c| key.matches(c)).cloned())
    }

    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let tables = self.lock();
        let mut rows: Vec<Candidate> = tables
            .candidates
            .values()
            .filter(|c| filter.accepts(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.exam_id.cmp(&a.exam_id)));
        Ok(rows)
    }

    async fn modify<'a>(&self, key: &CandidateKey, mutation: Mutation<'a>) -> Result<Candidate> {
        let mut tables = self.lock();
        let current = tables
            .candidates
            .values()
            .find(|c| key.matches(c))
            .ok_or_else(|| Error::NotFound(format!("No record for {}", key)))?;

        let mut draft = current.clone();
        mutation(&mut draft)?;
        draft.check_invariants()?;
        draft.updated_at = Utc::now();

        tables.candidates.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.lock().candidates.remove(&id))
    }

    async fn next_exam_sequence(&self, year: i32) -> Result<u32> {
        let mut tables = self.lock();
        let value = tables.exam_sequences.entry(year).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
