use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn generate_password(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Session ids are derived from the exam id and the start instant.
pub fn session_id_for(exam_id: &str, started_at: DateTime<Utc>) -> String {
    format!("SES-{}-{}", exam_id, started_at.timestamp_millis())
}
