use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Extension, Multipart, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::info;
use validator::Validate;

use crate::dto::api_response::ApiResponse;
use crate::dto::auth_dto::{
    profile_changes_from, AccountResponse, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshTokenRequest,
    RegisterRequest, RegisteredResponse, ResendOtpRequest, TokenResponse, VerifyOtpRequest,
};
use crate::handler::form::read_multipart;
use crate::middlewares::auth_middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::model::account::Account;
use crate::service::auth_service::{AuthService, AuthServiceImpl, OtpOutcome};
use crate::util::error::{HandlerError, ServiceError};
use crate::util::jwt::TokenPair;

pub struct AuthHandlerState {
    pub auth_service: Arc<AuthServiceImpl>,
    /// Mark session cookies `Secure`
    pub cookie_secure: bool,
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn set_session_cookies(cookies: &Cookies, tokens: &TokenPair, secure: bool) {
    cookies.add(session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure));
    cookies.add(session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure));
}

fn account_id(account: &Account) -> Result<bson::oid::ObjectId, HandlerError> {
    account
        .id
        .ok_or_else(|| ServiceError::Internal("Account has no id".to_string()).into())
}

fn validated<T: Validate>(payload: T) -> Result<T, HandlerError> {
    payload
        .validate()
        .map_err(|e| HandlerError::from(ServiceError::Validation(format!("Validation error: {}", e))))?;
    Ok(payload)
}

pub async fn register_handler(
    State(state): State<Arc<AuthHandlerState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut form = read_multipart(multipart).await?;
    let request = RegisterRequest {
        user_name: form.take_field("userName").unwrap_or_default(),
        email: form.take_field("email").unwrap_or_default(),
        password: form.take_field("password").unwrap_or_default(),
        phone: form.take_field("phone").unwrap_or_default(),
        role: form.take_field("role"),
        address: form.take_field("address"),
    };
    let avatar = form.take_file("avatar");

    let account = state.auth_service.register(request, avatar).await?;
    Ok(ApiResponse::created(
        RegisteredResponse { email: account.email },
        "User registered successfully. Please verify your email with the OTP sent.",
    ))
}

pub async fn verify_otp_handler(
    State(state): State<Arc<AuthHandlerState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;

    match state.auth_service.verify_otp(&payload.email, &payload.otp).await? {
        OtpOutcome::Verified => Ok(ApiResponse::ok(json!({}), "Email verified successfully")),
        OtpOutcome::AlreadyVerified => Err(HandlerError::bad_request("User already verified")),
    }
}

pub async fn resend_otp_handler(
    State(state): State<Arc<AuthHandlerState>>,
    payload: Result<Json<ResendOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;

    state.auth_service.resend_otp(&payload.email).await?;
    Ok(ApiResponse::ok(json!({}), "OTP sent successfully"))
}

pub async fn login_handler(
    State(state): State<Arc<AuthHandlerState>>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let result = state.auth_service.login(payload).await?;

    set_session_cookies(&cookies, &result.tokens, state.cookie_secure);
    Ok(ApiResponse::ok(
        LoginResponse {
            user: AccountResponse::from(&result.account),
            access_token: result.tokens.access_token,
            refresh_token: result.tokens.refresh_token,
        },
        "User logged in successfully",
    ))
}

/// Takes the refresh token from its cookie, or from `{refreshToken}` in the body.
pub async fn refresh_token_handler(
    State(state): State<Arc<AuthHandlerState>>,
    cookies: Cookies,
    body: Bytes,
) -> Result<impl IntoResponse, HandlerError> {
    let from_body = || -> Result<Option<String>, HandlerError> {
        if body.is_empty() {
            return Ok(None);
        }
        let request: RefreshTokenRequest = serde_json::from_slice(&body)
            .map_err(|e| HandlerError::bad_request(format!("Invalid JSON body: {}", e)))?;
        Ok(request.refresh_token)
    };

    let token = match cookies.get(REFRESH_TOKEN_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => Some(cookie.value().to_string()),
        _ => from_body()?,
    }
    .filter(|t| !t.is_empty())
    .ok_or_else(|| HandlerError::unauthorized("Unauthorized request"))?;

    let tokens = state.auth_service.refresh_access_token(&token).await?;
    set_session_cookies(&cookies, &tokens, state.cookie_secure);
    Ok(ApiResponse::ok(
        TokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
        "Access token refreshed",
    ))
}

pub async fn logout_handler(
    State(state): State<Arc<AuthHandlerState>>,
    cookies: Cookies,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    state.auth_service.logout(&account_id(&account)?).await?;

    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        cookies.remove(session_cookie(name, String::new(), state.cookie_secure));
    }
    info!(account_id = %account.id_string(), "Session cookies cleared");
    Ok(ApiResponse::ok(json!({}), "User logged out"))
}

pub async fn update_account_handler(
    State(state): State<Arc<AuthHandlerState>>,
    Extension(account): Extension<Account>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    let changes = profile_changes_from(&payload);

    let updated = state
        .auth_service
        .update_profile(&account_id(&account)?, changes)
        .await?;
    Ok(ApiResponse::ok(
        AccountResponse::from(&updated),
        "Account details updated successfully",
    ))
}

pub async fn change_password_handler(
    State(state): State<Arc<AuthHandlerState>>,
    Extension(account): Extension<Account>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(payload) = payload?;
    state
        .auth_service
        .change_password(&account_id(&account)?, &payload.old_password, &payload.new_password)
        .await?;
    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}
