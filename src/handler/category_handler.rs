use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::dto::api_response::ApiResponse;
use crate::dto::catalog_dto::{CategoryRequest, CategoryResponse};
use crate::service::category_service::{CategoryService, CategoryServiceImpl};
use crate::util::error::HandlerError;

pub async fn create_category_handler(
    State(service): State<Arc<CategoryServiceImpl>>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let category = service.create(payload).await?;
    Ok(ApiResponse::created(
        CategoryResponse::from(&category),
        "Category created successfully",
    ))
}

pub async fn list_categories_handler(
    State(service): State<Arc<CategoryServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let categories = service.list().await?;
    let data: Vec<CategoryResponse> = categories.iter().map(CategoryResponse::from).collect();
    Ok(ApiResponse::ok(data, "Categories fetched successfully"))
}

pub async fn update_category_handler(
    State(service): State<Arc<CategoryServiceImpl>>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let category = service.update(&id, payload).await?;
    Ok(ApiResponse::ok(
        CategoryResponse::from(&category),
        "Category updated successfully",
    ))
}

pub async fn delete_category_handler(
    State(service): State<Arc<CategoryServiceImpl>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let category = service.delete(&id).await?;
    Ok(ApiResponse::ok(
        CategoryResponse::from(&category),
        "Category deleted successfully",
    ))
}
