pub mod account_service;
pub mod aggregation;
pub mod candidate_service;
pub mod correction_service;
pub mod grading_service;
pub mod score_service;
pub mod session_service;
pub mod test_bank;
pub mod violation_service;
