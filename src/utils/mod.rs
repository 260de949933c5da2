pub mod crypto;
pub mod exam_id;
pub mod token;
