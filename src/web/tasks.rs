use crate::db;
use crate::domain::models::{Task, TaskPriority, TaskStatus, UserRole};
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{
    extract::{Path, State},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

const STAFF: &[UserRole] = &[UserRole::Employee, UserRole::Supervisor, UserRole::HrManager];

#[derive(Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub duration_minutes: Option<i32>,
    pub due_date: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub duration_minutes: Option<i32>,
    pub due_date: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct StatusPayload {
    pub status: TaskStatus,
}

#[derive(Deserialize)]
pub struct AssignTaskPayload {
    pub employee_id: Uuid,
    #[serde(flatten)]
    pub task: CreateTaskPayload,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create_task))
        .route("/my", get(my_tasks))
        .route("/supervisor/assign", post(assign_task))
        .route("/supervisor/team", get(team_tasks))
        .route("/supervisor/:id", put(supervisor_update_task))
        .route("/supervisor/:id", delete(supervisor_delete_task))
        .route("/:id", get(get_task))
        .route("/:id", put(update_task))
        .route("/:id", delete(delete_task))
        .route("/:id/status", patch(update_status))
        .with_state(state)
}

fn validate_new_task(payload: &CreateTaskPayload) -> Result<(TaskPriority, i32), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    let duration = payload.duration_minutes.unwrap_or(0);
    if duration < 0 {
        return Err(AppError::Validation(
            "Duration must not be negative".to_string(),
        ));
    }
    Ok((payload.priority.unwrap_or(TaskPriority::Medium), duration))
}

async fn create_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<Json<Task>, AppError> {
    claims.require(STAFF)?;
    let (priority, duration_minutes) = validate_new_task(&payload)?;

    let task = db::insert_task(
        &state.pool,
        &db::NewTask {
            employee_id: claims.user_id,
            assigned_by_id: claims.user_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            priority,
            duration_minutes,
            due_date: payload.due_date,
        },
    )
    .await?;
    Ok(Json(task))
}

async fn my_tasks(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Task>>, AppError> {
    claims.require(STAFF)?;
    let tasks = db::list_tasks_for_employee(&state.pool, claims.user_id).await?;
    Ok(Json(tasks))
}

async fn get_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    claims.require(STAFF)?;
    let task = db::find_task_for_employee(&state.pool, task_id, claims.user_id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(Json(task))
}

async fn update_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<Json<Task>, AppError> {
    claims.require(STAFF)?;
    let mut task = db::find_task_for_employee(&state.pool, task_id, claims.user_id)
        .await?
        .ok_or_else(task_not_found)?;

    apply_update(&mut task, payload)?;
    let updated = db::update_task(&state.pool, &task).await?;
    Ok(Json(updated))
}

async fn delete_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;
    if db::find_task_for_employee(&state.pool, task_id, claims.user_id)
        .await?
        .is_none()
    {
        return Err(task_not_found());
    }
    db::delete_task(&state.pool, task_id).await?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn update_status(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;
    if db::find_task_for_employee(&state.pool, task_id, claims.user_id)
        .await?
        .is_none()
    {
        return Err(task_not_found());
    }
    db::update_task_status(&state.pool, task_id, payload.status).await?;
    let status_str = format!("{:?}", payload.status).to_lowercase();
    Ok(Json(json!({
        "message": format!("Task status updated to {status_str}")
    })))
}

/// A supervisor assigns a task to an employee of their own team.
async fn assign_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<AssignTaskPayload>,
) -> Result<Json<Task>, AppError> {
    claims.require(&[UserRole::Supervisor])?;
    let (priority, duration_minutes) = validate_new_task(&payload.task)?;

    let me = db::find_user_by_id(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let employee = db::find_user_by_id(&state.pool, payload.employee_id).await?;

    let in_team = employee
        .as_ref()
        .map(|e| {
            e.role == UserRole::Employee && e.is_active && e.team_id.is_some() && e.team_id == me.team_id
        })
        .unwrap_or(false);
    if !in_team {
        return Err(AppError::NotFound(
            "Employee not found in your team".to_string(),
        ));
    }

    let task = db::insert_task(
        &state.pool,
        &db::NewTask {
            employee_id: payload.employee_id,
            assigned_by_id: claims.user_id,
            title: payload.task.title.trim(),
            description: payload.task.description.as_deref(),
            priority,
            duration_minutes,
            due_date: payload.task.due_date,
        },
    )
    .await?;
    Ok(Json(task))
}

async fn team_tasks(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Vec<db::TaskWithNames>>, AppError> {
    claims.require(&[UserRole::Supervisor])?;
    let me = db::find_user_by_id(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let tasks = match me.team_id {
        Some(team_id) => db::list_tasks_for_team(&state.pool, team_id).await?,
        None => Vec::new(),
    };
    Ok(Json(tasks))
}

/// Supervisor edit of a team member's task.
async fn supervisor_update_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<Json<Task>, AppError> {
    claims.require(&[UserRole::Supervisor])?;
    let mut task = team_task(&state, claims.user_id, task_id).await?;

    apply_update(&mut task, payload)?;
    let updated = db::update_task(&state.pool, &task).await?;
    Ok(Json(updated))
}

async fn supervisor_delete_task(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Supervisor])?;
    let task = team_task(&state, claims.user_id, task_id).await?;
    db::delete_task(&state.pool, task.id).await?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

async fn team_task(
    state: &SharedState,
    supervisor_id: Uuid,
    task_id: Uuid,
) -> Result<Task, AppError> {
    let me = db::find_user_by_id(&state.pool, supervisor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let team_id = me.team_id.ok_or_else(task_not_found)?;
    db::find_task_in_team(&state.pool, task_id, team_id)
        .await?
        .ok_or_else(task_not_found)
}

fn apply_update(task: &mut Task, payload: UpdateTaskPayload) -> Result<(), AppError> {
    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        task.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        task.description = Some(description);
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if let Some(duration) = payload.duration_minutes {
        if duration < 0 {
            return Err(AppError::Validation(
                "Duration must not be negative".to_string(),
            ));
        }
        task.duration_minutes = duration;
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }
    Ok(())
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".to_string())
}
