pub mod answer;
pub mod band;
pub mod candidate;
pub mod exam_module;
pub mod exam_status;
pub mod scores;
pub mod violation;
