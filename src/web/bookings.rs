//! Consultant-facing booking review surface: pending queue, approval with
//! automatic conflict cancellation, rejection and completion.
use crate::db;
use crate::domain::models::UserRole;
use crate::error::AppError;
use crate::services::booking;
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approved,
    Rejected,
}

#[derive(Deserialize)]
pub struct ReviewPayload {
    pub status: ReviewAction,
    pub rejection_reason: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(all_bookings))
        .route("/pending", get(pending_bookings))
        .route("/:id/approve", put(review_booking))
        .route("/:id/complete", put(complete_booking))
        .with_state(state)
}

async fn own_consultant_id(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Uuid, AppError> {
    db::find_consultant_by_user(&state.pool, user_id)
        .await?
        .map(|consultant| consultant.id)
        .ok_or_else(|| AppError::NotFound("Consultant profile not found".to_string()))
}

async fn all_bookings(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<db::BookingWithNames>>, AppError> {
    claims.require(&[UserRole::Psychiatrist])?;
    let consultant_id = own_consultant_id(&state, claims.user_id).await?;
    let bookings = db::list_bookings_for_consultant(&state.pool, consultant_id).await?;
    Ok(Json(bookings))
}

async fn pending_bookings(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<db::BookingWithNames>>, AppError> {
    claims.require(&[UserRole::Psychiatrist])?;
    let consultant_id = own_consultant_id(&state, claims.user_id).await?;
    let bookings = db::list_pending_for_consultant(&state.pool, consultant_id).await?;
    Ok(Json(bookings))
}

/// Review a pending request. Approving sweeps every other pending request
/// for the same slot and reports how many were auto-cancelled.
async fn review_booking(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Psychiatrist])?;

    match payload.status {
        ReviewAction::Approved => {
            let (_, cancelled_conflicts) =
                booking::approve_booking(&state.pool, claims.user_id, booking_id).await?;
            Ok(Json(json!({
                "status": "approved",
                "cancelled_conflicts": cancelled_conflicts,
            })))
        }
        ReviewAction::Rejected => {
            let reason = payload.rejection_reason.unwrap_or_default();
            booking::reject_booking(&state.pool, claims.user_id, booking_id, &reason).await?;
            Ok(Json(json!({
                "status": "rejected",
                "cancelled_conflicts": 0,
            })))
        }
    }
}

async fn complete_booking(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Psychiatrist])?;
    booking::complete_booking(&state.pool, claims.user_id, booking_id).await?;
    Ok(Json(json!({ "status": "completed" })))
}
