use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::book_handler::{create_book_handler, delete_book_handler, list_books_handler, update_book_handler};
use crate::middlewares::auth_middleware::{require_auth, require_author_or_admin, AuthState};
use crate::service::book_service::BookServiceImpl;

pub fn book_router(service: Arc<BookServiceImpl>, auth_state: Arc<AuthState>) -> Router {
    let authenticated = Router::new()
        .route("/books", get(list_books_handler))
        .route("/books/", get(list_books_handler))
        .route_layer(middleware::from_fn_with_state(auth_state.clone(), require_auth));

    let authors = Router::new()
        .route("/books/create", post(create_book_handler))
        .route("/books/update-book/{id}", put(update_book_handler))
        .route("/books/delete-book/{id}", delete(delete_book_handler))
        .route_layer(middleware::from_fn(require_author_or_admin))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    authenticated.merge(authors).with_state(service)
}
