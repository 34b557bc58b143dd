use axum::{
    extract::{rejection::JsonRejection, Extension, Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::dto::api_response::ApiResponse;
use crate::dto::catalog_dto::{BookResponse, NewBookForm, UpdateBookRequest};
use crate::handler::form::read_multipart;
use crate::model::account::Account;
use crate::service::book_service::{BookService, BookServiceImpl};
use crate::util::error::HandlerError;

pub async fn create_book_handler(
    State(service): State<Arc<BookServiceImpl>>,
    Extension(account): Extension<Account>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut form = read_multipart(multipart).await?;
    let book_form = NewBookForm {
        title: form.take_field("title"),
        price: form.take_field("price"),
        description: form.take_field("description"),
        stock: form.take_field("stock"),
        category: form.take_field("category"),
        images: form.take_files("images"),
    };
    debug!("Book form with {} images", book_form.images.len());

    let book = service.create(book_form, &account).await?;
    Ok(ApiResponse::created(BookResponse::from(&book), "Book created successfully"))
}

pub async fn list_books_handler(
    State(service): State<Arc<BookServiceImpl>>,
) -> Result<impl IntoResponse, HandlerError> {
    let books = service.list().await?;
    Ok(ApiResponse::ok(books, "Books fetched successfully"))
}

pub async fn update_book_handler(
    State(service): State<Arc<BookServiceImpl>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let book = service.update(&id, payload, &account).await?;
    Ok(ApiResponse::ok(BookResponse::from(&book), "Book updated successfully"))
}

pub async fn delete_book_handler(
    State(service): State<Arc<BookServiceImpl>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let book = service.delete(&id, &account).await?;
    Ok(ApiResponse::ok(BookResponse::from(&book), "Book deleted successfully"))
}
