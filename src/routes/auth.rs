/// Authentication Routes
///
/// Registration, login, identity, token refresh and token revocation.
/// Token checks happen in the `TokenGate` middleware; handlers that take
/// `web::ReqData<TokenClaims>` only run once the gate has passed.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::TokenClaims;
use crate::error::{AppError, AuthError, ErrorContext, StoreError};
use crate::startup::AppState;
use crate::store::User;
use crate::validators::required_field;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Serialize)]
pub struct WhoamiResponse {
    pub username: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /auth/register
///
/// # Errors
/// - 400: Missing username, email or password
/// - 409: Username already registered
/// - 500: Store failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let username = required_field("username", form.username.as_deref())?;
    let email = required_field("email", form.email.as_deref())?;
    let password = required_field("password", form.password.as_deref())?;
    let context = context.with_username(&username);

    if state.credentials.find_by_username(&username).await?.is_some() {
        return Err(AuthError::UserExists.into());
    }

    let password_hash = state.hasher.hash(&password)?;
    let user = User::new(username, email, password_hash);

    // A concurrent registration can pass the lookup above; the store's
    // uniqueness check decides the winner.
    state.credentials.create(&user).await.map_err(|e| match e {
        StoreError::Duplicate(_) => AppError::from(AuthError::UserExists),
        other => {
            let err = AppError::from(other);
            context.log_error(&err);
            err
        }
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        username = %user.username,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id: user.id,
    }))
}

/// POST /auth/login
///
/// Issues a fresh access token and a refresh token.
///
/// # Errors
/// - 400: Missing username or password
/// - 404: Unknown username
/// - 401: Wrong password
pub async fn login(
    form: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let username = required_field("username", form.username.as_deref())?;
    let password = required_field("password", form.password.as_deref())?;

    let user = state
        .credentials
        .find_by_username(&username)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !state.hasher.verify(&password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let pair = state.tokens.issue_pair(&user.username)?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        username = %user.username,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.access_token_expiry(),
    }))
}

/// GET /auth/whoami
///
/// **Requires a valid access token.** The user is loaded fresh from the
/// store by the token's subject; a subject that no longer exists is a 401.
pub async fn whoami(
    claims: web::ReqData<TokenClaims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .credentials
        .find_by_username(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!(sub = %claims.sub, "Token subject no longer exists");
            AuthError::UserLookupFailed
        })?;

    Ok(HttpResponse::Ok().json(WhoamiResponse {
        username: user.username,
        email: user.email,
    }))
}

/// GET /auth/refresh
///
/// **Requires a valid refresh token.** Claims are derived again for the
/// subject; nothing is carried over from the refresh token.
pub async fn refresh(
    claims: web::ReqData<TokenClaims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let access_token = state.tokens.access_token_for(&claims.sub, false)?;

    tracing::info!(sub = %claims.sub, "Access token refreshed");

    Ok(HttpResponse::Ok().json(AccessTokenResponse { access_token }))
}

/// GET /auth/revoke_token
///
/// **Accepts an access or refresh token.** Revokes the presented token.
pub async fn revoke_token(
    claims: web::ReqData<TokenClaims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let claims = claims.into_inner();
    state.tokens.revoke(&claims).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("{} revoked successfully", claims.token_type),
    }))
}
