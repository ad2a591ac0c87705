//! HR management of consultants: accounts, profiles and availability
//! templates. Template changes cascade onto pending bookings.
use crate::db;
use crate::db::consultants::{
    AvailabilityWindow, ConsultantCreation, NewConsultantAccount, AVAILABILITY_CHANGED_REASON,
    CONSULTANT_RETIRED_REASON,
};
use crate::domain::models::UserRole;
use crate::error::AppError;
use crate::services::{notify, password};
use crate::state::SharedState;
use crate::web::consultants::consultant_with_availabilities;
use crate::web::session::Auth;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct AvailabilityPayload {
    pub day_of_week: i16,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Deserialize)]
pub struct CreateConsultantPayload {
    pub name: String,
    pub qualifications: String,
    pub registration_number: String,
    pub hospital: String,
    pub specialization: String,
    pub email: String,
    pub password: String,
    pub availabilities: Vec<AvailabilityPayload>,
}

#[derive(Deserialize)]
pub struct UpdateConsultantPayload {
    pub name: Option<String>,
    pub qualifications: Option<String>,
    pub registration_number: Option<String>,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub availabilities: Option<Vec<AvailabilityPayload>>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/consultants", post(create_consultant))
        .route("/consultants", get(list_consultants))
        .route("/consultants/:id", get(get_consultant))
        .route("/consultants/:id", put(update_consultant))
        .route("/consultants/:id", delete(delete_consultant))
        .route("/consultants/:id/bookings", get(consultant_bookings))
        .with_state(state)
}

fn parse_windows(payloads: &[AvailabilityPayload]) -> Result<Vec<AvailabilityWindow>, AppError> {
    let mut windows = Vec::with_capacity(payloads.len());
    for availability in payloads {
        if !(0..=6).contains(&availability.day_of_week) {
            return Err(AppError::Validation(
                "day_of_week must be between 0 (Monday) and 6 (Sunday)".to_string(),
            ));
        }
        let start = NaiveTime::parse_from_str(&availability.start_time, "%H:%M")
            .map_err(|_| invalid_time(&availability.start_time))?;
        let end = NaiveTime::parse_from_str(&availability.end_time, "%H:%M")
            .map_err(|_| invalid_time(&availability.end_time))?;
        if start >= end {
            return Err(AppError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        windows.push((availability.day_of_week, start, end, availability.is_available));
    }
    Ok(windows)
}

fn invalid_time(raw: &str) -> AppError {
    AppError::Validation(format!("Invalid time format: {raw}. Expected HH:MM"))
}

async fn create_consultant(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<CreateConsultantPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let name = payload.name.trim();
    if name.len() < 2 {
        return Err(AppError::Validation(
            "Name must be at least 2 characters long".to_string(),
        ));
    }
    let registration_number = payload.registration_number.trim();
    if registration_number.len() < 3 {
        return Err(AppError::Validation(
            "Registration number must be at least 3 characters long".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if payload.availabilities.is_empty() {
        return Err(AppError::Validation(
            "At least one availability slot is required".to_string(),
        ));
    }
    password::validate_password_strength(&payload.password).map_err(AppError::Validation)?;
    let windows = parse_windows(&payload.availabilities)?;

    let password_hash = password::hash_password(&payload.password)?;
    let created = db::consultants::create_consultant_account(
        &state.pool,
        &NewConsultantAccount {
            name,
            qualifications: &payload.qualifications,
            registration_number,
            hospital: &payload.hospital,
            specialization: &payload.specialization,
            email: &payload.email,
            password_hash: &password_hash,
            windows: &windows,
        },
    )
    .await?;

    let consultant = match created {
        ConsultantCreation::Created(consultant) => consultant,
        ConsultantCreation::RegistrationNumberTaken => {
            return Err(AppError::Conflict(
                "Registration number already exists".to_string(),
            ));
        }
        ConsultantCreation::EmailTaken => {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
    };

    tracing::info!("created consultant {} ({})", consultant.name, consultant.id);

    let mut body = consultant_with_availabilities(&state.pool, &consultant).await?;
    if let Some(object) = body.as_object_mut() {
        object.insert("email".to_string(), json!(payload.email));
    }
    Ok(Json(json!({
        "message": "Consultant created successfully with availability",
        "consultant": body,
    })))
}

async fn list_consultants(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Value>>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let consultants = db::list_consultants(&state.pool).await?;
    let mut result = Vec::with_capacity(consultants.len());
    for consultant in &consultants {
        result.push(consultant_with_availabilities(&state.pool, consultant).await?);
    }
    Ok(Json(result))
}

async fn get_consultant(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(consultant_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let consultant = db::find_consultant(&state.pool, consultant_id)
        .await?
        .ok_or_else(consultant_not_found)?;
    Ok(Json(
        consultant_with_availabilities(&state.pool, &consultant).await?,
    ))
}

async fn update_consultant(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(consultant_id): Path<Uuid>,
    Json(payload): Json<UpdateConsultantPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let mut consultant = db::find_consultant(&state.pool, consultant_id)
        .await?
        .ok_or_else(consultant_not_found)?;

    if let Some(name) = &payload.name {
        if name.trim().len() < 2 {
            return Err(AppError::Validation(
                "Name must be at least 2 characters long".to_string(),
            ));
        }
        consultant.name = name.trim().to_string();
    }
    if let Some(qualifications) = &payload.qualifications {
        consultant.qualifications = qualifications.clone();
    }
    if let Some(hospital) = &payload.hospital {
        consultant.hospital = hospital.clone();
    }
    if let Some(specialization) = &payload.specialization {
        consultant.specialization = specialization.clone();
    }
    if let Some(registration_number) = &payload.registration_number {
        let registration_number = registration_number.trim();
        if db::registration_number_taken(&state.pool, registration_number, Some(consultant.id))
            .await?
        {
            return Err(AppError::Conflict(
                "Registration number already exists".to_string(),
            ));
        }
        consultant.registration_number = registration_number.to_string();
    }
    db::update_consultant_profile(&state.pool, &consultant).await?;

    if payload.email.is_some() || payload.password.is_some() {
        if let Some(email) = &payload.email {
            if !email.contains('@') {
                return Err(AppError::Validation("Invalid email address".to_string()));
            }
            if db::email_taken(&state.pool, email, Some(consultant.user_id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }
        let hash = match &payload.password {
            Some(plain) => {
                password::validate_password_strength(plain).map_err(AppError::Validation)?;
                Some(password::hash_password(plain)?)
            }
            None => None,
        };
        db::update_user_account(
            &state.pool,
            consultant.user_id,
            payload.email.as_deref(),
            hash.as_deref(),
        )
        .await?;
    }

    let mut cancelled_ids: Vec<Uuid> = Vec::new();
    if let Some(availabilities) = &payload.availabilities {
        let windows = parse_windows(availabilities)?;
        let cancelled =
            db::consultants::replace_availability_template(&state.pool, consultant.id, &windows)
                .await?;
        for booking in &cancelled {
            notify::booking_cancelled(&state.pool, booking, AVAILABILITY_CHANGED_REASON).await;
        }
        cancelled_ids = cancelled.iter().map(|booking| booking.id).collect();
    }

    let body = consultant_with_availabilities(&state.pool, &consultant).await?;
    Ok(Json(json!({
        "message": "Consultant updated successfully",
        "cancelled_bookings": cancelled_ids,
        "consultant": body,
    })))
}

async fn delete_consultant(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(consultant_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let cancelled = db::consultants::retire_consultant(&state.pool, consultant_id)
        .await?
        .ok_or_else(consultant_not_found)?;

    for booking in &cancelled {
        notify::booking_cancelled(&state.pool, booking, CONSULTANT_RETIRED_REASON).await;
    }

    Ok(Json(json!({
        "message": "Consultant deleted successfully",
        "cancelled_bookings": cancelled.len(),
    })))
}

async fn consultant_bookings(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(consultant_id): Path<Uuid>,
) -> Result<Json<Vec<db::BookingWithNames>>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    if db::find_consultant(&state.pool, consultant_id).await?.is_none() {
        return Err(consultant_not_found());
    }
    let bookings = db::list_bookings_for_consultant(&state.pool, consultant_id).await?;
    Ok(Json(bookings))
}

fn consultant_not_found() -> AppError {
    AppError::NotFound("Consultant not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(day: i16, start: &str, end: &str) -> AvailabilityPayload {
        AvailabilityPayload {
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_available: true,
        }
    }

    #[test]
    fn parses_valid_windows() {
        let windows = parse_windows(&[window(0, "09:00", "12:30")]).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].0, 0);
    }

    #[test]
    fn rejects_bad_day() {
        assert!(parse_windows(&[window(7, "09:00", "10:00")]).is_err());
        assert!(parse_windows(&[window(-1, "09:00", "10:00")]).is_err());
    }

    #[test]
    fn rejects_bad_times() {
        assert!(parse_windows(&[window(1, "9am", "10:00")]).is_err());
        assert!(parse_windows(&[window(1, "10:00", "09:00")]).is_err());
        assert!(parse_windows(&[window(1, "10:00", "10:00")]).is_err());
    }
}
