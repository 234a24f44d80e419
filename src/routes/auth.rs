/// Authentication Routes
///
/// Registration, login, refresh-token rotation and logout. Handlers only
/// validate input and translate between JSON and `AuthService` calls.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AccessClaims, AuthService, AuthSession, Profile, TokenPair};
use crate::error::{AppError, ErrorContext};
use crate::validators::{normalize_email, require_non_empty, validate_new_password};

/// Registration and login request body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair response; `user` is present for register and login
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Profile>,
}

impl AuthResponse {
    fn new(tokens: TokenPair, expires_in: i64, user: Option<Profile>) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }

    fn from_session(session: AuthSession, expires_in: i64) -> Self {
        Self::new(session.tokens, expires_in, Some(session.profile))
    }
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid email, or password shorter than 6 characters
/// - 409: email already registered
pub async fn register(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_registration");

    let email = normalize_email(&form.email)?;
    validate_new_password(&form.password)?;

    let session = auth.register(&email, &form.password).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %session.profile.id,
        "Registration completed"
    );

    Ok(HttpResponse::Created().json(AuthResponse::from_session(
        session,
        auth.access_token_expiry(),
    )))
}

/// POST /auth/login
///
/// Unknown email and wrong password produce the same 401 response.
pub async fn login(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("account_login");

    let email = normalize_email(&form.email)?;
    require_non_empty("password", &form.password)?;

    let session = auth.authenticate(&email, &form.password).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %session.profile.id,
        "Login completed"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::from_session(
        session,
        auth.access_token_expiry(),
    )))
}

/// POST /auth/refresh
///
/// # Errors
/// - 401 `INVALID_REFRESH`: bad signature, expired, or unknown account
/// - 401 `SESSION_TERMINATED`: token reuse detected or no active session;
///   the client must log in again
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    require_non_empty("refresh_token", &form.refresh_token)?;

    let tokens = auth.rotate(&form.refresh_token).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(tokens, auth.access_token_expiry(), None)))
}

/// POST /auth/logout
///
/// Ends every session of the authenticated account. Requires a bearer
/// access token.
pub async fn logout(
    claims: web::ReqData<AccessClaims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let account_id = claims.account_id()?;
    let context = ErrorContext::new("logout").with_account_id(account_id.to_string());

    auth.end_session(account_id).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Logged out" })))
}
