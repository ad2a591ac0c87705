//! Notification dispatch for booking state transitions. Dispatch is a
//! best-effort side effect: it runs after the booking transaction has
//! committed, and failures are logged, never propagated.
use crate::db;
use crate::domain::models::{ConsultantBooking, NotificationType};
use sqlx::PgPool;
use uuid::Uuid;

fn when(booking: &ConsultantBooking) -> String {
    booking.booking_date.format("%Y-%m-%d %H:%M").to_string()
}

async fn push(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    notification_type: NotificationType,
    booking_id: Uuid,
) {
    if let Err(err) =
        db::insert_notification(pool, user_id, title, message, notification_type, Some(booking_id))
            .await
    {
        tracing::warn!(
            "failed to record {:?} notification for user {}: {:#}",
            notification_type,
            user_id,
            err
        );
    }
}

async fn user_name(pool: &PgPool, user_id: Uuid) -> String {
    match db::find_user_by_id(pool, user_id).await {
        Ok(Some(user)) => user.name,
        _ => "Unknown".to_string(),
    }
}

/// Notify the consultant about a new request and, when booked on behalf of
/// someone, the employee as well.
pub async fn booking_created(pool: &PgPool, booking: &ConsultantBooking) {
    match db::find_consultant(pool, booking.consultant_id).await {
        Ok(Some(consultant)) => {
            let employee = user_name(pool, booking.employee_id).await;
            push(
                pool,
                consultant.user_id,
                "New Booking Request",
                &format!("New booking request from {} for {}", employee, when(booking)),
                NotificationType::BookingCreated,
                booking.id,
            )
            .await;
        }
        Ok(None) => {
            tracing::warn!(
                "no consultant record for booking {}, skipping consultant notification",
                booking.id
            );
        }
        Err(err) => {
            tracing::warn!("consultant lookup failed for booking {}: {:#}", booking.id, err);
        }
    }

    if booking.employee_id != booking.booked_by_id {
        let booker = user_name(pool, booking.booked_by_id).await;
        push(
            pool,
            booking.employee_id,
            "Session Booked for You",
            &format!(
                "A consultation session has been booked for you on {} by {}",
                when(booking),
                booker
            ),
            NotificationType::BookingCreated,
            booking.id,
        )
        .await;
    }
}

/// Employee (and booker, when different) message for a transition.
async fn notify_participants(
    pool: &PgPool,
    booking: &ConsultantBooking,
    title: &str,
    employee_message: String,
    booker_message: String,
    notification_type: NotificationType,
) {
    push(
        pool,
        booking.employee_id,
        title,
        &employee_message,
        notification_type,
        booking.id,
    )
    .await;

    if booking.employee_id != booking.booked_by_id {
        push(
            pool,
            booking.booked_by_id,
            title,
            &booker_message,
            notification_type,
            booking.id,
        )
        .await;
    }
}

pub async fn booking_approved(pool: &PgPool, booking: &ConsultantBooking) {
    let employee = user_name(pool, booking.employee_id).await;
    notify_participants(
        pool,
        booking,
        "Session Approved",
        format!("Your consultation session on {} has been approved", when(booking)),
        format!(
            "The session you booked for {} on {} has been approved",
            employee,
            when(booking)
        ),
        NotificationType::BookingApproved,
    )
    .await;
}

pub async fn booking_rejected(pool: &PgPool, booking: &ConsultantBooking, reason: &str) {
    let employee = user_name(pool, booking.employee_id).await;
    notify_participants(
        pool,
        booking,
        "Session Rejected",
        format!(
            "Your consultation session on {} has been rejected. Reason: {}",
            when(booking),
            reason
        ),
        format!(
            "The session you booked for {} on {} has been rejected. Reason: {}",
            employee,
            when(booking),
            reason
        ),
        NotificationType::BookingRejected,
    )
    .await;
}

pub async fn booking_cancelled(pool: &PgPool, booking: &ConsultantBooking, reason: &str) {
    let employee = user_name(pool, booking.employee_id).await;
    notify_participants(
        pool,
        booking,
        "Session Cancelled",
        format!(
            "Your consultation session on {} has been cancelled. Reason: {}",
            when(booking),
            reason
        ),
        format!(
            "The session you booked for {} on {} has been cancelled. Reason: {}",
            employee,
            when(booking),
            reason
        ),
        NotificationType::BookingCancelled,
    )
    .await;
}

pub async fn session_completed(pool: &PgPool, booking: &ConsultantBooking) {
    let employee = user_name(pool, booking.employee_id).await;
    notify_participants(
        pool,
        booking,
        "Session Completed",
        format!(
            "Your consultation session on {} has been marked as completed",
            when(booking)
        ),
        format!(
            "The session you booked for {} on {} has been marked as completed",
            employee,
            when(booking)
        ),
        NotificationType::SessionCompleted,
    )
    .await;
}
