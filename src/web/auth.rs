use crate::db;
use crate::domain::models::UserRole;
use crate::error::AppError;
use crate::services::password;
use crate::state::SharedState;
use crate::web::session::{self, Auth};
use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: UserRole,
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .with_state(state)
}

async fn login(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip = addr.ip().to_string();
    if !state.login_limiter.check(&ip).await {
        tracing::warn!("login rate limit exceeded for IP: {}", ip);
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::find_user_by_email(&state.pool, &payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password::verify_password(&payload.password, &user.hash) {
        return Err(invalid_credentials());
    }

    let token = session::sign_session(user.id, user.role, &state.session_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("session signing failed: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        format!("session={token}; HttpOnly; SameSite=Lax; Path=/")
            .parse()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid cookie header")))?,
    );

    tracing::info!("user {} logged in", user.id);
    Ok((
        headers,
        Json(LoginResponse {
            user_id: user.id,
            role: user.role,
            name: user.name,
        }),
    ))
}

async fn me(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = db::find_user_by_id(&state.pool, claims.user_id)
        .await?
        .ok_or_else(invalid_credentials)?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        role: user.role,
        name: user.name,
    }))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}
