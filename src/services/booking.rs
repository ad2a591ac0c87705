//! Booking conflict resolver: orchestrates the transactional writes in
//! `db::bookings` and fans out notifications once a transition has
//! committed.
use crate::db;
use crate::db::bookings::{
    ApprovalOutcome, BookingAttempt, CancelOutcome, NewBooking, TransitionOutcome,
};
use crate::domain::booking::AUTO_CANCEL_REASON;
use crate::domain::models::ConsultantBooking;
use crate::error::AppError;
use crate::services::notify;
use chrono::{NaiveDateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct BookingRequest {
    pub consultant_id: Uuid,
    pub employee_id: Uuid,
    pub booked_by_id: Uuid,
    pub booking_date: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

fn wall_clock_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub async fn request_booking(
    pool: &PgPool,
    request: BookingRequest,
) -> Result<ConsultantBooking, AppError> {
    if db::find_consultant(pool, request.consultant_id).await?.is_none() {
        return Err(AppError::NotFound("Consultant not found".to_string()));
    }
    if db::find_user_by_id(pool, request.employee_id).await?.is_none() {
        return Err(AppError::NotFound("Employee not found".to_string()));
    }
    if request.booking_date <= wall_clock_now() {
        return Err(AppError::Validation(
            "Booking date must be in the future".to_string(),
        ));
    }
    if request.duration_minutes <= 0 {
        return Err(AppError::Validation(
            "Duration must be positive".to_string(),
        ));
    }

    let attempt = db::bookings::create_booking_guarded(
        pool,
        &NewBooking {
            consultant_id: request.consultant_id,
            employee_id: request.employee_id,
            booked_by_id: request.booked_by_id,
            booking_date: request.booking_date,
            duration_minutes: request.duration_minutes,
            notes: request.notes.as_deref(),
        },
    )
    .await?;

    match attempt {
        BookingAttempt::Created(booking) => {
            notify::booking_created(pool, &booking).await;
            Ok(booking)
        }
        BookingAttempt::OutsideAvailability => Err(AppError::Validation(
            "Consultant is not available at this time".to_string(),
        )),
        BookingAttempt::SlotTaken => Err(AppError::Conflict(
            "This time slot is already booked".to_string(),
        )),
    }
}

/// Approve a pending booking on behalf of the consultant identified by
/// `approver_user_id`. Returns the approved booking and how many competing
/// requests were auto-cancelled.
pub async fn approve_booking(
    pool: &PgPool,
    approver_user_id: Uuid,
    booking_id: Uuid,
) -> Result<(ConsultantBooking, usize), AppError> {
    let consultant = owning_consultant(pool, approver_user_id).await?;

    match db::bookings::approve_booking_guarded(pool, booking_id, consultant.id).await? {
        ApprovalOutcome::Approved { booking, cancelled } => {
            notify::booking_approved(pool, &booking).await;
            for rival in &cancelled {
                notify::booking_cancelled(pool, rival, AUTO_CANCEL_REASON).await;
            }
            Ok((booking, cancelled.len()))
        }
        ApprovalOutcome::NotFound => Err(booking_not_found()),
        ApprovalOutcome::NotPending(status) => Err(AppError::State(format!(
            "Only pending bookings can be approved (current status: {status:?})"
        ))),
    }
}

pub async fn reject_booking(
    pool: &PgPool,
    approver_user_id: Uuid,
    booking_id: Uuid,
    reason: &str,
) -> Result<ConsultantBooking, AppError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "A rejection reason is required".to_string(),
        ));
    }
    let consultant = owning_consultant(pool, approver_user_id).await?;

    match db::bookings::reject_booking_guarded(pool, booking_id, consultant.id, reason).await? {
        TransitionOutcome::Done(booking) => {
            notify::booking_rejected(pool, &booking, reason).await;
            Ok(booking)
        }
        TransitionOutcome::NotFound => Err(booking_not_found()),
        TransitionOutcome::InvalidState(status) => Err(AppError::State(format!(
            "Only pending bookings can be rejected (current status: {status:?})"
        ))),
    }
}

pub async fn complete_booking(
    pool: &PgPool,
    approver_user_id: Uuid,
    booking_id: Uuid,
) -> Result<ConsultantBooking, AppError> {
    let consultant = owning_consultant(pool, approver_user_id).await?;

    match db::bookings::complete_booking_guarded(pool, booking_id, consultant.id).await? {
        TransitionOutcome::Done(booking) => {
            notify::session_completed(pool, &booking).await;
            Ok(booking)
        }
        TransitionOutcome::NotFound => Err(booking_not_found()),
        TransitionOutcome::InvalidState(status) => Err(AppError::State(format!(
            "Only approved bookings can be completed (current status: {status:?})"
        ))),
    }
}

pub async fn cancel_booking(
    pool: &PgPool,
    actor_id: Uuid,
    booking_id: Uuid,
) -> Result<ConsultantBooking, AppError> {
    match db::bookings::cancel_booking_guarded(pool, booking_id, actor_id, wall_clock_now()).await?
    {
        CancelOutcome::Cancelled(booking) => {
            notify::booking_cancelled(pool, &booking, "Cancelled by the requester").await;
            Ok(booking)
        }
        CancelOutcome::NotFound => Err(booking_not_found()),
        CancelOutcome::InvalidState(status) => Err(AppError::State(format!(
            "Only pending or approved bookings can be cancelled (current status: {status:?})"
        ))),
        CancelOutcome::InPast => Err(AppError::Validation(
            "Cannot cancel past bookings".to_string(),
        )),
    }
}

async fn owning_consultant(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<crate::domain::models::Consultant, AppError> {
    db::find_consultant_by_user(pool, user_id)
        .await?
        .ok_or_else(booking_not_found)
}

fn booking_not_found() -> AppError {
    AppError::NotFound("Booking not found".to_string())
}
