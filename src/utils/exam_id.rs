use crate::database::store::CandidateStore;
use crate::error::{Error, Result};

pub const EXAM_ID_PREFIX: &str = "EX";
const SEQUENCE_WIDTH: usize = 4;
const MAX_SEQUENCE: u32 = 9_999;

pub fn format_exam_id(year: i32, sequence: u32) -> String {
    format!("{}{}{:0width$}", EXAM_ID_PREFIX, year, sequence, width = SEQUENCE_WIDTH)
}

/// Allocates the next exam id for `year` from the store's atomic counter.
pub async fn allocate_exam_id(store: &dyn CandidateStore, year: i32) -> Result<String> {
    let sequence = store.next_exam_sequence(year).await?;
    if sequence == 0 || sequence > MAX_SEQUENCE {
        return Err(Error::Internal(format!(
            "Exam ID sequence for {} exhausted at {}",
            year, sequence
        )));
    }
    Ok(format_exam_id(year, sequence))
}
