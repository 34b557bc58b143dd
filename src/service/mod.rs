pub mod auth_service;
pub mod book_service;
pub mod category_service;

use bson::oid::ObjectId;

use crate::util::error::ServiceError;

/// Parses a path id, reporting a malformed one as a validation failure.
pub fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(value.trim()).map_err(|_| ServiceError::Validation(format!("Invalid {} id", what)))
}
