use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{debug, warn};

use crate::model::account::{Account, Role};
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::util::error::HandlerError;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub struct AuthState {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub auth_service: Arc<AuthServiceImpl>,
}

/// Resolves the caller from the `accessToken` cookie, falling back to a Bearer
/// header, and stores the loaded `Account` in the request extensions.
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    cookies: Cookies,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let token = match cookies.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| HandlerError::unauthorized("Unauthorized request"))?;
            state
                .jwt_utils
                .extract_token_from_header(header)
                .map_err(|_| HandlerError::unauthorized("Unauthorized request"))?
        }
    };

    let claims = state.jwt_utils.validate_access_token(&token).map_err(|e| {
        debug!("Access token rejected: {}", e);
        HandlerError::unauthorized("Invalid access token")
    })?;

    let account = state.auth_service.current_account(&claims.sub).await?;
    req.extensions_mut().insert(account);

    Ok(next.run(req).await)
}

fn require_role(account: &Account, allowed: &[Role]) -> Result<(), HandlerError> {
    if account.role.is_one_of(allowed) {
        Ok(())
    } else {
        warn!(role = %account.role, "Role not allowed for this route");
        Err(HandlerError::forbidden("You do not have permission to perform this action"))
    }
}

pub async fn require_admin(
    Extension(account): Extension<Account>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    require_role(&account, &[Role::Admin])?;
    Ok(next.run(req).await)
}

pub async fn require_author_or_admin(
    Extension(account): Extension<Account>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    require_role(&account, &[Role::Author, Role::Admin])?;
    Ok(next.run(req).await)
}
