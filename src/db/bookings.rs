//! Transactional booking writes. Every state change runs inside one
//! transaction; competing requests for a (consultant, instant) pair are
//! serialized with a transaction-scoped advisory lock, since `FOR UPDATE`
//! cannot lock rows that are not inserted yet.
use crate::domain::booking::AUTO_CANCEL_REASON;
use crate::domain::models::{BookingStatus, ConsultantBooking};
use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, consultant_id, employee_id, booked_by_id, booking_date, \
                               duration_minutes, status, notes, rejection_reason, created_at, \
                               updated_at";

pub struct NewBooking<'a> {
    pub consultant_id: Uuid,
    pub employee_id: Uuid,
    pub booked_by_id: Uuid,
    pub booking_date: NaiveDateTime,
    pub duration_minutes: i32,
    pub notes: Option<&'a str>,
}

#[derive(Debug)]
pub enum BookingAttempt {
    Created(ConsultantBooking),
    /// No availability window covers the requested start time.
    OutsideAvailability,
    /// A pending or approved booking already holds this exact instant.
    SlotTaken,
}

#[derive(Debug)]
pub enum ApprovalOutcome {
    Approved {
        booking: ConsultantBooking,
        cancelled: Vec<ConsultantBooking>,
    },
    NotFound,
    NotPending(BookingStatus),
}

#[derive(Debug)]
pub enum TransitionOutcome {
    Done(ConsultantBooking),
    NotFound,
    InvalidState(BookingStatus),
}

#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled(ConsultantBooking),
    NotFound,
    InvalidState(BookingStatus),
    InPast,
}

async fn lock_slot(
    conn: &mut PgConnection,
    consultant_id: Uuid,
    booking_date: NaiveDateTime,
) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(consultant_id.to_string())
        .bind(booking_date.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_booking_for_update(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
) -> Result<Option<ConsultantBooking>> {
    let booking = sqlx::query_as::<_, ConsultantBooking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM consultant_bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(booking)
}

async fn set_status(
    conn: &mut PgConnection,
    booking_id: Uuid,
    status: BookingStatus,
    rejection_reason: Option<&str>,
) -> Result<ConsultantBooking> {
    let booking = sqlx::query_as::<_, ConsultantBooking>(&format!(
        r#"
        UPDATE consultant_bookings
        SET status = $2,
            rejection_reason = COALESCE($3, rejection_reason),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(booking_id)
    .bind(status)
    .bind(rejection_reason)
    .fetch_one(conn)
    .await?;
    Ok(booking)
}

/// Create a booking request, enforcing the availability-template and
/// duplicate-slot checks inside the same transaction as the insert.
pub async fn create_booking_guarded(
    pool: &PgPool,
    new: &NewBooking<'_>,
) -> Result<BookingAttempt> {
    let mut tx = pool.begin().await?;
    lock_slot(&mut tx, new.consultant_id, new.booking_date).await?;

    let day_of_week = i16::try_from(
        chrono::Datelike::weekday(&new.booking_date.date()).num_days_from_monday(),
    )
    .expect("weekday index fits in i16");
    let start_time = new.booking_date.time();

    let in_window: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM consultant_availabilities
            WHERE consultant_id = $1
              AND day_of_week = $2
              AND is_available = true
              AND start_time <= $3
              AND end_time > $3
        )
        "#,
    )
    .bind(new.consultant_id)
    .bind(day_of_week)
    .bind(start_time)
    .fetch_one(&mut *tx)
    .await?;
    if !in_window {
        return Ok(BookingAttempt::OutsideAvailability);
    }

    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM consultant_bookings
            WHERE consultant_id = $1
              AND booking_date = $2
              AND status IN ('PENDING', 'APPROVED')
        )
        "#,
    )
    .bind(new.consultant_id)
    .bind(new.booking_date)
    .fetch_one(&mut *tx)
    .await?;
    if taken {
        return Ok(BookingAttempt::SlotTaken);
    }

    let booking = sqlx::query_as::<_, ConsultantBooking>(&format!(
        r#"
        INSERT INTO consultant_bookings (consultant_id, employee_id, booked_by_id,
                                         booking_date, duration_minutes, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(new.consultant_id)
    .bind(new.employee_id)
    .bind(new.booked_by_id)
    .bind(new.booking_date)
    .bind(new.duration_minutes)
    .bind(new.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(BookingAttempt::Created(booking))
}

/// Approve one pending booking and atomically cancel every other pending
/// request competing for the same (consultant, instant) slot.
pub async fn approve_booking_guarded(
    pool: &PgPool,
    booking_id: Uuid,
    consultant_id: Uuid,
) -> Result<ApprovalOutcome> {
    let mut tx = pool.begin().await?;

    let Some(booking) = fetch_booking_for_update(&mut tx, booking_id).await? else {
        return Ok(ApprovalOutcome::NotFound);
    };
    if booking.consultant_id != consultant_id {
        return Ok(ApprovalOutcome::NotFound);
    }
    if !booking.status.can_transition(BookingStatus::Approved) {
        return Ok(ApprovalOutcome::NotPending(booking.status));
    }

    lock_slot(&mut tx, booking.consultant_id, booking.booking_date).await?;

    let competing = sqlx::query_as::<_, ConsultantBooking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM consultant_bookings
        WHERE consultant_id = $1
          AND booking_date = $2
          AND status = 'PENDING'
          AND id != $3
        FOR UPDATE
        "#
    ))
    .bind(booking.consultant_id)
    .bind(booking.booking_date)
    .bind(booking.id)
    .fetch_all(&mut *tx)
    .await?;

    let approved = set_status(&mut tx, booking.id, BookingStatus::Approved, None).await?;

    let mut cancelled = Vec::with_capacity(competing.len());
    for rival in &competing {
        cancelled.push(
            set_status(
                &mut tx,
                rival.id,
                BookingStatus::Cancelled,
                Some(AUTO_CANCEL_REASON),
            )
            .await?,
        );
    }

    tx.commit().await?;
    Ok(ApprovalOutcome::Approved {
        booking: approved,
        cancelled,
    })
}

pub async fn reject_booking_guarded(
    pool: &PgPool,
    booking_id: Uuid,
    consultant_id: Uuid,
    reason: &str,
) -> Result<TransitionOutcome> {
    let mut tx = pool.begin().await?;

    let Some(booking) = fetch_booking_for_update(&mut tx, booking_id).await? else {
        return Ok(TransitionOutcome::NotFound);
    };
    if booking.consultant_id != consultant_id {
        return Ok(TransitionOutcome::NotFound);
    }
    if !booking.status.can_transition(BookingStatus::Rejected) {
        return Ok(TransitionOutcome::InvalidState(booking.status));
    }

    let rejected = set_status(&mut tx, booking.id, BookingStatus::Rejected, Some(reason)).await?;
    tx.commit().await?;
    Ok(TransitionOutcome::Done(rejected))
}

pub async fn complete_booking_guarded(
    pool: &PgPool,
    booking_id: Uuid,
    consultant_id: Uuid,
) -> Result<TransitionOutcome> {
    let mut tx = pool.begin().await?;

    let Some(booking) = fetch_booking_for_update(&mut tx, booking_id).await? else {
        return Ok(TransitionOutcome::NotFound);
    };
    if booking.consultant_id != consultant_id {
        return Ok(TransitionOutcome::NotFound);
    }
    if !booking.status.can_transition(BookingStatus::Completed) {
        return Ok(TransitionOutcome::InvalidState(booking.status));
    }

    let completed = set_status(&mut tx, booking.id, BookingStatus::Completed, None).await?;
    tx.commit().await?;
    Ok(TransitionOutcome::Done(completed))
}

/// Cancel a booking on behalf of its employee or booker. Past bookings stay
/// untouched.
pub async fn cancel_booking_guarded(
    pool: &PgPool,
    booking_id: Uuid,
    actor_id: Uuid,
    now: NaiveDateTime,
) -> Result<CancelOutcome> {
    let mut tx = pool.begin().await?;

    let Some(booking) = fetch_booking_for_update(&mut tx, booking_id).await? else {
        return Ok(CancelOutcome::NotFound);
    };
    if booking.employee_id != actor_id && booking.booked_by_id != actor_id {
        return Ok(CancelOutcome::NotFound);
    }
    if !booking.status.can_transition(BookingStatus::Cancelled) {
        return Ok(CancelOutcome::InvalidState(booking.status));
    }
    if booking.booking_date <= now {
        return Ok(CancelOutcome::InPast);
    }

    let cancelled = set_status(&mut tx, booking.id, BookingStatus::Cancelled, None).await?;
    tx.commit().await?;
    Ok(CancelOutcome::Cancelled(cancelled))
}

pub(super) async fn set_status_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: Uuid,
    status: BookingStatus,
    rejection_reason: Option<&str>,
) -> Result<ConsultantBooking> {
    set_status(tx, booking_id, status, rejection_reason).await
}

pub(super) async fn lock_pending_for_consultant(
    tx: &mut Transaction<'_, Postgres>,
    consultant_id: Uuid,
) -> Result<Vec<ConsultantBooking>> {
    let pending = sqlx::query_as::<_, ConsultantBooking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM consultant_bookings
        WHERE consultant_id = $1
          AND status = 'PENDING'
        FOR UPDATE
        "#
    ))
    .bind(consultant_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(pending)
}

