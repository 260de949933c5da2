pub mod admin_dto;
pub mod exam_dto;
