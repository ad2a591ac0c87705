use crate::db;
use crate::domain::models::Notification;
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(my_notifications))
        .route("/unread-count", get(unread_count))
        .route("/:id/mark-read", put(mark_read))
        .route("/mark-all-read", put(mark_all_read))
        .with_state(state)
}

async fn my_notifications(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = db::list_notifications(&state.pool, claims.user_id).await?;
    Ok(Json(notifications))
}

async fn unread_count(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    let count = db::unread_notification_count(&state.pool, claims.user_id).await?;
    Ok(Json(json!({ "unread_count": count })))
}

async fn mark_read(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let found = db::mark_notification_read(&state.pool, notification_id, claims.user_id).await?;
    if !found {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

async fn mark_all_read(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    db::mark_all_notifications_read(&state.pool, claims.user_id).await?;
    Ok(Json(json!({ "message": "All notifications marked as read" })))
}
