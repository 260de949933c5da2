use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::store::{CandidateFilter, CandidateKey, CandidateStore, Mutation};
use crate::error::{Error, Result};
use crate::models::answer::AnswerSheet;
use crate::models::candidate::{Candidate, ClientInfo, TestAssignment};
use crate::models::exam_module::ExamModule;
use crate::models::scores::Scores;
use crate::models::violation::ViolationEntry;

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: Uuid,
    exam_id: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    is_active: bool,
    payment_confirmed: bool,
    may_retake: bool,
    assignment: Json<TestAssignment>,
    status: String,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    client_ip: Option<String>,
    client_fingerprint: Option<String>,
    completed_modules: Vec<String>,
    scores: Json<Scores>,
    answers: Json<AnswerSheet>,
    violations: Json<Vec<ViolationEntry>>,
    total_violations: i32,
    results_published: bool,
    admin_remarks: Option<String>,
    account_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = Error;

    fn try_from(row: CandidateRow) -> Result<Self> {
        let completed_modules = row
            .completed_modules
            .iter()
            .map(|m| m.parse::<ExamModule>())
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(Candidate {
            id: row.id,
            exam_id: row.exam_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            is_active: row.is_active,
            payment_confirmed: row.payment_confirmed,
            may_retake: row.may_retake,
            assignment: row.assignment.0,
            status: row.status.parse()?,
            session_id: row.session_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            client: ClientInfo {
                ip: row.client_ip,
                fingerprint: row.client_fingerprint,
            },
            completed_modules,
            scores: row.scores.0,
            answers: row.answers.0,
            violations: row.violations.0,
            total_violations: row.total_violations.max(0) as u32,
            results_published: row.results_published,
            admin_remarks: row.admin_remarks,
            account_id: row.account_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn module_names(candidate: &Candidate) -> Vec<String> {
    candidate
        .completed_modules
        .iter()
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        key: &CandidateKey,
    ) -> Result<Option<CandidateRow>> {
        let row = match key {
            CandidateKey::Id(id) => {
                sqlx::query_as::<_, CandidateRow>(r#"SELECT * FROM candidates WHERE id = $1 FOR UPDATE"#)
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            CandidateKey::ExamId(exam_id) => {
                sqlx::query_as::<_, CandidateRow>(r#"SELECT * FROM candidates WHERE exam_id = $1 FOR UPDATE"#)
                    .bind(exam_id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
        };
        Ok(row)
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn insert(&self, candidate: Candidate) -> Result<Candidate> {
        candidate.check_invariants()?;
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (
                id, exam_id, full_name, email, phone, is_active, payment_confirmed, may_retake,
                assignment, status, completed_modules, scores, answers, violations, total_violations,
                results_published, admin_remarks, account_id, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20
            )
            RETURNING *
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.exam_id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(candidate.is_active)
        .bind(candidate.payment_confirmed)
        .bind(candidate.may_retake)
        .bind(Json(&candidate.assignment))
        .bind(candidate.status.as_str())
        .bind(module_names(&candidate))
        .bind(Json(&candidate.scores))
        .bind(Json(&candidate.answers))
        .bind(Json(&candidate.violations))
        .bind(candidate.total_violations as i32)
        .bind(candidate.results_published)
        .bind(&candidate.admin_remarks)
        .bind(candidate.account_id)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(format!("Exam ID {} is already taken", candidate.exam_id))
            }
            other => Error::from(other),
        })?;

        row.try_into()
    }

    async fn find(&self, key: &CandidateKey) -> Result<Option<Candidate>> {
        let row = match key {
            CandidateKey::Id(id) => {
                sqlx::query_as::<_, CandidateRow>(r#"SELECT * FROM candidates WHERE id = $1"#)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            CandidateKey::ExamId(exam_id) => {
                sqlx::query_as::<_, CandidateRow>(r#"SELECT * FROM candidates WHERE exam_id = $1"#)
                    .bind(exam_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.map(Candidate::try_from).transpose()
    }

    async fn list(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT * FROM candidates
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR full_name ILIKE $2 ESCAPE '\'
                   OR email ILIKE $2 ESCAPE '\'
                   OR exam_id ILIKE $2 ESCAPE '\')
            ORDER BY created_at DESC, exam_id DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Candidate::try_from).collect()
    }

    async fn modify<'a>(&self, key: &CandidateKey, mutation: Mutation<'a>) -> Result<Candidate> {
        let mut tx = self.pool.begin().await?;

        let row = Self::lock_row(&mut tx, key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No record for {}", key)))?;
        let mut candidate = Candidate::try_from(row)?;

        // An Err here drops the transaction, which rolls back the row lock.
        mutation(&mut candidate)?;
        candidate.check_invariants()?;

        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates
            SET full_name = $2, email = $3, phone = $4,
                is_active = $5, payment_confirmed = $6, may_retake = $7,
                assignment = $8, status = $9, session_id = $10,
                started_at = $11, completed_at = $12,
                client_ip = $13, client_fingerprint = $14,
                completed_modules = $15, scores = $16, answers = $17,
                violations = $18, total_violations = $19,
                results_published = $20, admin_remarks = $21, account_id = $22,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(candidate.is_active)
        .bind(candidate.payment_confirmed)
        .bind(candidate.may_retake)
        .bind(Json(&candidate.assignment))
        .bind(candidate.status.as_str())
        .bind(&candidate.session_id)
        .bind(candidate.started_at)
        .bind(candidate.completed_at)
        .bind(&candidate.client.ip)
        .bind(&candidate.client.fingerprint)
        .bind(module_names(&candidate))
        .bind(Json(&candidate.scores))
        .bind(Json(&candidate.answers))
        .bind(Json(&candidate.violations))
        .bind(candidate.total_violations as i32)
        .bind(candidate.results_published)
        .bind(&candidate.admin_remarks)
        .bind(candidate.account_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Candidate>> {
        let row = sqlx::query_as::<_, CandidateRow>(r#"DELETE FROM candidates WHERE id = $1 RETURNING *"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Candidate::try_from).transpose()
    }

    async fn next_exam_sequence(&self, year: i32) -> Result<u32> {
        let value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO exam_id_counters (year, last_value)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = exam_id_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(value.max(0) as u32)
    }
}

/// `ILIKE` pattern matching `term` literally anywhere in the column.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("alice"), "%alice%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }
}
