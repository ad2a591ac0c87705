//! Consultant lifecycle writes that must stay atomic: account creation with
//! its availability template, template replacement, and retirement. Pending
//! bookings invalidated by these changes are cancelled in the same
//! transaction.
use super::bookings::{lock_pending_for_consultant, set_status_in_tx};
use crate::domain::models::{BookingStatus, Consultant, ConsultantBooking};
use anyhow::Result;
use chrono::{Datelike, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

/// (day_of_week, start, end, is_available)
pub type AvailabilityWindow = (i16, NaiveTime, NaiveTime, bool);

pub const AVAILABILITY_CHANGED_REASON: &str =
    "Cancelled - the consultant's availability changed";
pub const CONSULTANT_RETIRED_REASON: &str = "Cancelled - the consultant is no longer available";

pub struct NewConsultantAccount<'a> {
    pub name: &'a str,
    pub qualifications: &'a str,
    pub registration_number: &'a str,
    pub hospital: &'a str,
    pub specialization: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub windows: &'a [AvailabilityWindow],
}

#[derive(Debug)]
pub enum ConsultantCreation {
    Created(Consultant),
    RegistrationNumberTaken,
    EmailTaken,
}

/// Create the consultant profile, its login account and availability
/// template as one unit.
pub async fn create_consultant_account(
    pool: &PgPool,
    new: &NewConsultantAccount<'_>,
) -> Result<ConsultantCreation> {
    let mut tx = pool.begin().await?;

    let registration_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM consultants WHERE registration_number = $1)",
    )
    .bind(new.registration_number)
    .fetch_one(&mut *tx)
    .await?;
    if registration_taken {
        return Ok(ConsultantCreation::RegistrationNumberTaken);
    }

    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(new.email)
            .fetch_one(&mut *tx)
            .await?;
    if email_taken {
        return Ok(ConsultantCreation::EmailTaken);
    }

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, hash, role, name)
        VALUES ($1, $2, 'PSYCHIATRIST', $3)
        RETURNING id
        "#,
    )
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.name)
    .fetch_one(&mut *tx)
    .await?;

    let consultant = sqlx::query_as::<_, Consultant>(
        r#"
        INSERT INTO consultants (user_id, name, qualifications, registration_number,
                                 hospital, specialization)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, name, qualifications, registration_number, hospital,
                  specialization, is_active, created_at
        "#,
    )
    .bind(user_id)
    .bind(new.name)
    .bind(new.qualifications)
    .bind(new.registration_number)
    .bind(new.hospital)
    .bind(new.specialization)
    .fetch_one(&mut *tx)
    .await?;

    insert_windows(&mut tx, consultant.id, new.windows).await?;

    tx.commit().await?;
    Ok(ConsultantCreation::Created(consultant))
}

/// Replace a consultant's availability template and cancel pending bookings
/// that no longer fall inside any window. Returns the cancelled bookings.
pub async fn replace_availability_template(
    pool: &PgPool,
    consultant_id: Uuid,
    windows: &[AvailabilityWindow],
) -> Result<Vec<ConsultantBooking>> {
    let mut tx = pool.begin().await?;

    let pending = lock_pending_for_consultant(&mut tx, consultant_id).await?;

    sqlx::query("DELETE FROM consultant_availabilities WHERE consultant_id = $1")
        .bind(consultant_id)
        .execute(&mut *tx)
        .await?;
    insert_windows(&mut tx, consultant_id, windows).await?;

    let mut cancelled = Vec::new();
    for booking in &pending {
        let day = i16::try_from(booking.booking_date.date().weekday().num_days_from_monday())
            .expect("weekday index fits in i16");
        let time = booking.booking_date.time();
        let still_covered = windows.iter().any(|&(window_day, start, end, available)| {
            available && window_day == day && start <= time && time < end
        });
        if !still_covered {
            cancelled.push(
                set_status_in_tx(
                    &mut tx,
                    booking.id,
                    BookingStatus::Cancelled,
                    Some(AVAILABILITY_CHANGED_REASON),
                )
                .await?,
            );
        }
    }

    tx.commit().await?;
    Ok(cancelled)
}

/// Retire a consultant: cancel their pending bookings, deactivate the
/// consultant record and its linked account. Booking history is preserved.
pub async fn retire_consultant(
    pool: &PgPool,
    consultant_id: Uuid,
) -> Result<Option<Vec<ConsultantBooking>>> {
    let mut tx = pool.begin().await?;

    let user_id: Option<Uuid> = sqlx::query_scalar(
        "SELECT user_id FROM consultants WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(consultant_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    let pending = lock_pending_for_consultant(&mut tx, consultant_id).await?;

    let mut cancelled = Vec::with_capacity(pending.len());
    for booking in &pending {
        cancelled.push(
            set_status_in_tx(
                &mut tx,
                booking.id,
                BookingStatus::Cancelled,
                Some(CONSULTANT_RETIRED_REASON),
            )
            .await?,
        );
    }

    sqlx::query("UPDATE consultants SET is_active = false WHERE id = $1")
        .bind(consultant_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET is_active = false, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(cancelled))
}

async fn insert_windows(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    consultant_id: Uuid,
    windows: &[AvailabilityWindow],
) -> Result<()> {
    for &(day_of_week, start_time, end_time, is_available) in windows {
        sqlx::query(
            r#"
            INSERT INTO consultant_availabilities
                (consultant_id, day_of_week, start_time, end_time, is_available)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(consultant_id)
        .bind(day_of_week)
        .bind(start_time)
        .bind(end_time)
        .bind(is_available)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
