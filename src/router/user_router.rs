use axum::{
    middleware,
    routing::{patch, post},
    Router,
};
use std::sync::Arc;

use crate::handler::auth_handler::{
    change_password_handler, login_handler, logout_handler, refresh_token_handler, register_handler,
    resend_otp_handler, update_account_handler, verify_otp_handler, AuthHandlerState,
};
use crate::middlewares::auth_middleware::{require_auth, AuthState};

pub fn user_router(state: Arc<AuthHandlerState>, auth_state: Arc<AuthState>) -> Router {
    let public = Router::new()
        .route("/users/register", post(register_handler))
        .route("/users/verify-otp", post(verify_otp_handler))
        .route("/users/resend-otp", post(resend_otp_handler))
        .route("/users/login", post(login_handler))
        .route("/users/refresh-token", post(refresh_token_handler));

    let authenticated = Router::new()
        .route("/users/logout", post(logout_handler))
        .route("/users/update-account", patch(update_account_handler))
        .route("/users/change-password", patch(change_password_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    public.merge(authenticated).with_state(state)
}
