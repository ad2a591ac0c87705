//! Role-scoped landing summaries.
use crate::db;
use crate::domain::models::{BookingStatus, TaskStatus, UserRole};
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/employee", get(employee_dashboard))
        .route("/supervisor", get(supervisor_dashboard))
        .route("/psychiatrist", get(psychiatrist_dashboard))
        .route("/hr", get(hr_dashboard))
        .with_state(state)
}

async fn employee_dashboard(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Employee])?;

    let assessment = db::find_assessment(&state.pool, claims.user_id).await?;
    let tasks = db::list_tasks_for_employee(&state.pool, claims.user_id).await?;
    let bookings = db::list_bookings_for_employee(&state.pool, claims.user_id).await?;

    let pending_tasks = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Pending)
        .count();
    let upcoming_sessions = bookings
        .iter()
        .filter(|booking| {
            matches!(
                booking.status,
                BookingStatus::Pending | BookingStatus::Approved
            )
        })
        .count();

    Ok(Json(json!({
        "stress_score": assessment.as_ref().map(|a| a.score),
        "stress_level": assessment.as_ref().map(|a| a.level),
        "tasks_total": tasks.len(),
        "tasks_pending": pending_tasks,
        "upcoming_sessions": upcoming_sessions,
    })))
}

async fn supervisor_dashboard(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Supervisor])?;

    let me = db::find_user_by_id(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let (members, tasks, scores) = match me.team_id {
        Some(team_id) => {
            let members = db::list_employees_in_team(&state.pool, team_id).await?;
            let tasks = db::list_tasks_for_team(&state.pool, team_id).await?;
            let scores = db::list_shared_scores_for_team(&state.pool, team_id).await?;
            (members, tasks, scores)
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let pending_reviews = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Pending)
        .count();

    Ok(Json(json!({
        "team_members": members.len(),
        "team_tasks": tasks.len(),
        "pending_reviews": pending_reviews,
        "stress_scores": scores,
    })))
}

async fn psychiatrist_dashboard(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Psychiatrist])?;

    let consultant = db::find_consultant_by_user(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultant profile not found".to_string()))?;

    let bookings = db::list_bookings_for_consultant(&state.pool, consultant.id).await?;
    let pending_requests = bookings
        .iter()
        .filter(|booking| booking.status == BookingStatus::Pending)
        .count();
    let mut patients: Vec<&str> = bookings
        .iter()
        .map(|booking| booking.employee_name.as_str())
        .collect();
    patients.sort_unstable();
    patients.dedup();

    Ok(Json(json!({
        "pending_requests": pending_requests,
        "total_bookings": bookings.len(),
        "patients": patients,
    })))
}

async fn hr_dashboard(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::HrManager])?;

    let employees = db::count_users_by_role(&state.pool, UserRole::Employee).await?;
    let supervisors = db::count_users_by_role(&state.pool, UserRole::Supervisor).await?;
    let psychiatrists = db::count_users_by_role(&state.pool, UserRole::Psychiatrist).await?;
    let shared_scores = db::list_shared_scores_for_hr(&state.pool).await?;

    Ok(Json(json!({
        "employees": employees,
        "supervisors": supervisors,
        "psychiatrists": psychiatrists,
        "stress_scores": shared_scores,
    })))
}
