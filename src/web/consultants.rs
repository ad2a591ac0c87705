use crate::db;
use crate::domain::models::{Consultant, UserRole};
use crate::error::AppError;
use crate::services::booking::{self, BookingRequest};
use crate::services::schedule::{self, SESSION_LENGTH_MINUTES};
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

const STAFF: &[UserRole] = &[UserRole::Employee, UserRole::Supervisor, UserRole::HrManager];

fn default_duration() -> i32 {
    60
}

#[derive(Deserialize)]
pub struct BookPayload {
    pub consultant_id: Uuid,
    /// ISO-8601 local time, treated as a wall-clock value.
    pub booking_date: NaiveDateTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct BookForEmployeePayload {
    pub employee_id: Uuid,
    #[serde(flatten)]
    pub booking: BookPayload,
}

#[derive(Deserialize)]
pub struct AvailableTimesQuery {
    pub date: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_consultants))
        .route("/book", post(book))
        .route("/book-for-employee", post(book_for_employee))
        .route("/my-bookings", get(my_bookings))
        .route("/:id/available-times", get(available_times))
        .route("/bookings/:id", delete(cancel_booking))
        .with_state(state)
}

pub(crate) async fn consultant_with_availabilities(
    pool: &PgPool,
    consultant: &Consultant,
) -> Result<Value, AppError> {
    let availabilities = db::list_availabilities(pool, consultant.id).await?;
    let availability_data: Vec<Value> = availabilities
        .iter()
        .map(|availability| {
            json!({
                "id": availability.id,
                "day_of_week": availability.day_of_week,
                "start_time": availability.start_time.format("%H:%M").to_string(),
                "end_time": availability.end_time.format("%H:%M").to_string(),
                "is_available": availability.is_available,
            })
        })
        .collect();

    Ok(json!({
        "id": consultant.id,
        "name": consultant.name,
        "qualifications": consultant.qualifications,
        "registration_number": consultant.registration_number,
        "hospital": consultant.hospital,
        "specialization": consultant.specialization,
        "availabilities": availability_data,
    }))
}

async fn list_consultants(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Value>>, AppError> {
    claims.require(STAFF)?;

    let consultants = db::list_consultants(&state.pool).await?;
    let mut result = Vec::with_capacity(consultants.len());
    for consultant in &consultants {
        result.push(consultant_with_availabilities(&state.pool, consultant).await?);
    }
    Ok(Json(result))
}

async fn book(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;

    let booking = booking::request_booking(
        &state.pool,
        BookingRequest {
            consultant_id: payload.consultant_id,
            employee_id: claims.user_id,
            booked_by_id: claims.user_id,
            booking_date: payload.booking_date,
            duration_minutes: payload.duration_minutes,
            notes: payload.notes,
        },
    )
    .await?;

    Ok(Json(json!({
        "booking_id": booking.id,
        "status": booking.status,
    })))
}

/// Supervisors and HR book on behalf of an employee; the booker and the
/// patient differ, and both get notified.
async fn book_for_employee(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<BookForEmployeePayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Supervisor, UserRole::HrManager])?;

    let booking = booking::request_booking(
        &state.pool,
        BookingRequest {
            consultant_id: payload.booking.consultant_id,
            employee_id: payload.employee_id,
            booked_by_id: claims.user_id,
            booking_date: payload.booking.booking_date,
            duration_minutes: payload.booking.duration_minutes,
            notes: payload.booking.notes,
        },
    )
    .await?;

    Ok(Json(json!({
        "booking_id": booking.id,
        "status": booking.status,
    })))
}

async fn my_bookings(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<db::BookingWithNames>>, AppError> {
    claims.require(STAFF)?;
    let bookings = db::list_bookings_for_employee(&state.pool, claims.user_id).await?;
    Ok(Json(bookings))
}

async fn available_times(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(consultant_id): Path<Uuid>,
    Query(query): Query<AvailableTimesQuery>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;

    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d").map_err(|_| {
        AppError::Validation("Invalid date format. Use YYYY-MM-DD".to_string())
    })?;

    let slots =
        schedule::list_available_slots(&state.pool, consultant_id, date, SESSION_LENGTH_MINUTES)
            .await?;

    let available_times: Vec<Value> = slots
        .iter()
        .map(|slot| {
            let start = slot.start_time.format("%H:%M").to_string();
            let end = slot.end_time.format("%H:%M").to_string();
            json!({
                "start_time": start,
                "end_time": end,
                "display": format!("{start} - {end}"),
            })
        })
        .collect();

    Ok(Json(json!({ "available_times": available_times })))
}

async fn cancel_booking(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;
    booking::cancel_booking(&state.pool, claims.user_id, booking_id).await?;
    Ok(Json(json!({ "message": "Booking cancelled successfully" })))
}
