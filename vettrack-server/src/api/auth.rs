//! Accounts, login sessions and the session middleware
//!
//! A session token travels in the `vettrack_session` cookie (browsers) or an
//! `Authorization: Bearer` header (API clients). Protected routes are wrapped
//! in [`require_session`], which puts a [`CurrentSession`] into the request
//! extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use vettrack_common::credentials::{hash_password, verify_password};
use vettrack_common::db::User;
use vettrack_common::time;

use super::{non_blank, ApiJson};
use crate::db::{sessions, users};
use crate::error::{ApiError, ApiResult};
use crate::services::speech;
use crate::AppState;

pub const SESSION_COOKIE: &str = "vettrack_session";

/// The authenticated caller of a protected route
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: User,
    pub welcome_pending: bool,
}

impl CurrentSession {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Session token from the bearer header or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Session middleware for protected routes
///
/// Missing, unknown and expired tokens all get 401 "User not logged in".
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(request.headers()).ok_or_else(ApiError::not_logged_in)?;

    let (record, user) = sessions::find_active_session(&state.db, &token, time::now())
        .await?
        .ok_or_else(ApiError::not_logged_in)?;

    debug!(user_id = user.id, path = %request.uri().path(), "Authenticated request");

    request.extensions_mut().insert(CurrentSession {
        token: record.token,
        user,
        welcome_pending: record.welcome_pending,
    });

    Ok(next.run(request).await)
}

/// POST /api/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<Json<Value>> {
    let full_name = non_blank(req.full_name.as_deref());
    let email = non_blank(req.email.as_deref());
    let password = req.password.as_deref().filter(|p| !p.trim().is_empty());
    let confirm = req.confirm_password.as_deref().filter(|p| !p.trim().is_empty());

    let (Some(full_name), Some(email), Some(password), Some(confirm)) =
        (full_name, email, password, confirm)
    else {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    };

    if password != confirm {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    let email = email.to_lowercase();
    if users::email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let digest = hash_password(password);
    let user = match users::create_user(&state.db, full_name, &email, &digest).await {
        Ok(user) => user,
        Err(vettrack_common::Error::InvalidInput(msg)) => return Err(ApiError::Conflict(msg)),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "Registered new user");

    Ok(Json(json!({ "success": true, "user": user })))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let email = non_blank(req.email.as_deref()).map(str::to_lowercase);
    let password = req.password.unwrap_or_default();

    let credentials = match email {
        Some(email) => users::find_credentials(&state.db, &email).await?,
        None => None,
    };

    let Some(credentials) = credentials
        .filter(|c| verify_password(&password, &c.password_hash, &c.password_salt))
    else {
        warn!("Rejected login attempt");
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    };

    let timeout = state.config.session_timeout_seconds;
    let session = sessions::create_session(&state.db, credentials.user.id, timeout).await?;

    info!(user_id = credentials.user.id, "User logged in");

    let cookie = session_cookie(&session.token, timeout);
    let body = json!({
        "success": true,
        "user": credentials.user,
        "token": session.token,
    });

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Response> {
    sessions::delete_session(&state.db, &session.token).await?;
    info!(user_id = session.user_id(), "User logged out");

    Ok((
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// GET /api/me
pub async fn current_user(Extension(session): Extension<CurrentSession>) -> Json<Value> {
    Json(json!({ "success": true, "user": session.user }))
}

/// GET /api/welcome
///
/// The greeting is returned until the client clears it.
pub async fn welcome(Extension(session): Extension<CurrentSession>) -> Json<Value> {
    let greeting = session
        .welcome_pending
        .then(|| speech::welcome_greeting(&session.user.full_name));

    Json(json!({ "success": true, "greeting": greeting }))
}

/// POST /api/clear_welcome_session
pub async fn clear_welcome_session(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> ApiResult<Json<Value>> {
    sessions::clear_welcome(&state.db, &session.token).await?;
    Ok(Json(json!({ "success": true })))
}

/// Routes that need a live session
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/logout", post(logout))
        .route("/api/me", get(current_user))
        .route("/api/welcome", get(welcome))
        .route("/api/clear_welcome_session", post(clear_welcome_session))
}

pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
}
