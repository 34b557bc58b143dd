use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::category_handler::{
    create_category_handler, delete_category_handler, list_categories_handler, update_category_handler,
};
use crate::middlewares::auth_middleware::{require_admin, require_auth, AuthState};
use crate::service::category_service::CategoryServiceImpl;

pub fn category_router(service: Arc<CategoryServiceImpl>, auth_state: Arc<AuthState>) -> Router {
    let authenticated = Router::new()
        .route("/categories", get(list_categories_handler))
        .route("/categories/", get(list_categories_handler))
        .route_layer(middleware::from_fn_with_state(auth_state.clone(), require_auth));

    // Layers run bottom-up: identity first, then the role gate
    let admin = Router::new()
        .route("/categories/create", post(create_category_handler))
        .route("/categories/update-category/{id}", put(update_category_handler))
        .route("/categories/delete-category/{id}", delete(delete_category_handler))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    authenticated.merge(admin).with_state(service)
}
