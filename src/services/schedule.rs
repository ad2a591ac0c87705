//! Availability listing: weekly template minus slot-blocking bookings,
//! recomputed fresh on every call.
use crate::db;
use crate::domain::slots::{self, BookedInterval, Slot};
use crate::error::AppError;
use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

pub use crate::domain::slots::SESSION_LENGTH_MINUTES;

pub async fn list_available_slots(
    pool: &PgPool,
    consultant_id: Uuid,
    date: NaiveDate,
    session_minutes: i64,
) -> Result<Vec<Slot>, AppError> {
    if db::find_consultant(pool, consultant_id).await?.is_none() {
        return Err(AppError::NotFound("Consultant not found".to_string()));
    }

    let day_of_week = i16::try_from(date.weekday().num_days_from_monday())
        .expect("weekday index fits in i16");
    let windows = db::list_day_windows(pool, consultant_id, day_of_week).await?;
    if windows.is_empty() {
        return Ok(Vec::new());
    }

    let bookings = db::list_blocking_bookings_on_date(pool, consultant_id, date).await?;

    let window_ranges: Vec<_> = windows
        .iter()
        .map(|window| (window.start_time, window.end_time))
        .collect();
    let booked: Vec<_> = bookings
        .iter()
        .map(|booking| BookedInterval {
            start: booking.booking_date,
            duration_minutes: booking.duration_minutes,
        })
        .collect();

    Ok(slots::free_slots(date, &window_ranges, &booked, session_minutes))
}
