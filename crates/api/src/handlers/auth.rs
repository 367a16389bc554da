//! Handlers for the `/auth` resource (login, refresh, logout).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use salescore_core::error::CoreError;
use salescore_core::types::DbId;
use salescore_db::models::session::CreateSession;
use salescore_db::repositories::{SessionRepo, UserRepo};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub company_id: DbId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find user by username.
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    // 2. Check if the account is active.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 3. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    // 4. Generate tokens and create the session.
    let issued = issue_tokens(&state.config.jwt, &user)?;
    SessionRepo::create(&state.pool, &issued.session).await?;
    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(auth_response(&state, issued, &user)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
/// Single-use rotation: the presented token's session is revoked before a
/// new one is issued.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Hash the provided refresh token and find the active session.
    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // 2. The user must still exist and be active.
    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 3. Generate the fresh pair, then rotate: revoke + insert commit as
    // one transaction, so a failed exchange never burns the presented
    // token without issuing a replacement.
    let issued = issue_tokens(&state.config.jwt, &user)?;
    SessionRepo::rotate(&state.pool, session.id, &issued.session).await?;
    tracing::info!(user_id = user.id, "refresh token rotated");
    Ok(Json(auth_response(&state, issued, &user)))
}

/// POST /api/v1/auth/logout
///
/// Revoke all active sessions for the authenticated user.
pub async fn logout(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<()>> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    tracing::info!(user_id = user.user_id, revoked, "logout");
    Ok(Json(()))
}

/// A generated token pair plus the session row to persist for it.
struct IssuedTokens {
    access_token: String,
    refresh_token: String,
    session: CreateSession,
}

/// Generate a token pair. Pure with respect to the database, so callers
/// can sequence persistence after generation has already succeeded.
fn issue_tokens(
    config: &crate::auth::jwt::JwtConfig,
    user: &salescore_db::models::user::User,
) -> Result<IssuedTokens, AppError> {
    let access_token = generate_access_token(user.id, &user.role, user.company_id, config)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_token, refresh_hash) = generate_refresh_token();
    let expires_at = Utc::now() + chrono::Duration::days(config.refresh_token_expiry_days);
    Ok(IssuedTokens {
        access_token,
        refresh_token,
        session: CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh_hash,
            expires_at,
        },
    })
}

fn auth_response(
    state: &AppState,
    issued: IssuedTokens,
    user: &salescore_db::models::user::User,
) -> AuthResponse {
    AuthResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserInfo {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
            company_id: user.company_id,
        },
    }
}
