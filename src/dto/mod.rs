pub mod api_response;
pub mod auth_dto;
pub mod catalog_dto;
pub mod file_dto;
