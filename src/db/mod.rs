pub mod bookings;
pub mod consultants;
pub mod seed;

use crate::domain::models::{
    Consultant, ConsultantAvailability, ConsultantBooking, DbUser, Notification,
    NotificationType, StressAssessment, StressLevel, Task, TaskPriority, TaskStatus, UserRole,
};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

// ========== Users ==========

const USER_COLUMNS: &str =
    "id, email, hash, role, name, department_id, team_id, is_active, created_at";

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = true"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn insert_user(
    pool: &PgPool,
    email: &str,
    hash: &str,
    role: UserRole,
    name: &str,
) -> Result<DbUser> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (email, hash, role, name)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(email)
    .bind(hash)
    .bind(role)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn list_users_by_role(pool: &PgPool, role: UserRole) -> Result<Vec<DbUser>> {
    let users = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE role = $1
          AND is_active = true
        ORDER BY created_at ASC
        "#
    ))
    .bind(role)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn list_employees_in_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<DbUser>> {
    let users = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE team_id = $1
          AND role = 'EMPLOYEE'
          AND is_active = true
        ORDER BY created_at ASC
        "#
    ))
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn email_taken(pool: &PgPool, email: &str, exclude: Option<Uuid>) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE email = $1
              AND ($2::uuid IS NULL OR id != $2)
        )
        "#,
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

/// Update a user's login email and/or password hash; untouched fields keep
/// their values.
pub async fn update_user_account(
    pool: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
    hash: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET email = COALESCE($2, email),
            hash = COALESCE($3, hash),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(hash)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_users_by_role(pool: &PgPool, role: UserRole) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND is_active = true")
            .bind(role)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

// ========== Consultants ==========

const CONSULTANT_COLUMNS: &str = "id, user_id, name, qualifications, registration_number, \
                                  hospital, specialization, is_active, created_at";

pub async fn find_consultant(pool: &PgPool, id: Uuid) -> Result<Option<Consultant>> {
    let consultant = sqlx::query_as::<_, Consultant>(&format!(
        "SELECT {CONSULTANT_COLUMNS} FROM consultants WHERE id = $1 AND is_active = true"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(consultant)
}

pub async fn find_consultant_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Consultant>> {
    let consultant = sqlx::query_as::<_, Consultant>(&format!(
        "SELECT {CONSULTANT_COLUMNS} FROM consultants WHERE user_id = $1 AND is_active = true"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(consultant)
}

pub async fn list_consultants(pool: &PgPool) -> Result<Vec<Consultant>> {
    let consultants = sqlx::query_as::<_, Consultant>(&format!(
        r#"
        SELECT {CONSULTANT_COLUMNS}
        FROM consultants
        WHERE is_active = true
        ORDER BY created_at ASC
        "#
    ))
    .fetch_all(pool)
    .await?;
    Ok(consultants)
}

pub async fn registration_number_taken(
    pool: &PgPool,
    registration_number: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM consultants
            WHERE registration_number = $1
              AND ($2::uuid IS NULL OR id != $2)
        )
        "#,
    )
    .bind(registration_number)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn update_consultant_profile(pool: &PgPool, consultant: &Consultant) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE consultants
        SET name = $2,
            qualifications = $3,
            registration_number = $4,
            hospital = $5,
            specialization = $6
        WHERE id = $1
        "#,
    )
    .bind(consultant.id)
    .bind(&consultant.name)
    .bind(&consultant.qualifications)
    .bind(&consultant.registration_number)
    .bind(&consultant.hospital)
    .bind(&consultant.specialization)
    .execute(pool)
    .await?;
    Ok(())
}

// ========== Consultant availability ==========

pub async fn list_availabilities(
    pool: &PgPool,
    consultant_id: Uuid,
) -> Result<Vec<ConsultantAvailability>> {
    let rows = sqlx::query_as::<_, ConsultantAvailability>(
        r#"
        SELECT id, consultant_id, day_of_week, start_time, end_time, is_available
        FROM consultant_availabilities
        WHERE consultant_id = $1
        ORDER BY day_of_week ASC, start_time ASC
        "#,
    )
    .bind(consultant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Availability windows usable on a given weekday (0 = Monday).
pub async fn list_day_windows(
    pool: &PgPool,
    consultant_id: Uuid,
    day_of_week: i16,
) -> Result<Vec<ConsultantAvailability>> {
    let rows = sqlx::query_as::<_, ConsultantAvailability>(
        r#"
        SELECT id, consultant_id, day_of_week, start_time, end_time, is_available
        FROM consultant_availabilities
        WHERE consultant_id = $1
          AND day_of_week = $2
          AND is_available = true
        ORDER BY start_time ASC
        "#,
    )
    .bind(consultant_id)
    .bind(day_of_week)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ========== Bookings (reads; transactional writes live in bookings.rs) ==========

const BOOKING_COLUMNS: &str = "id, consultant_id, employee_id, booked_by_id, booking_date, \
                               duration_minutes, status, notes, rejection_reason, created_at, \
                               updated_at";

/// Booking joined with the display names a listing needs.
#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct BookingWithNames {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub consultant_name: String,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub booked_by_id: Uuid,
    pub booked_by_name: String,
    pub booking_date: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: crate::domain::models::BookingStatus,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BOOKING_WITH_NAMES: &str = r#"
    SELECT b.id, b.consultant_id, c.name AS consultant_name,
           b.employee_id, e.name AS employee_name,
           b.booked_by_id, u.name AS booked_by_name,
           b.booking_date, b.duration_minutes, b.status, b.notes,
           b.rejection_reason, b.created_at, b.updated_at
    FROM consultant_bookings b
    JOIN consultants c ON c.id = b.consultant_id
    JOIN users e ON e.id = b.employee_id
    JOIN users u ON u.id = b.booked_by_id
"#;

pub async fn list_bookings_for_employee(
    pool: &PgPool,
    employee_id: Uuid,
) -> Result<Vec<BookingWithNames>> {
    let rows = sqlx::query_as::<_, BookingWithNames>(&format!(
        "{BOOKING_WITH_NAMES} WHERE b.employee_id = $1 ORDER BY b.booking_date DESC"
    ))
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_bookings_for_consultant(
    pool: &PgPool,
    consultant_id: Uuid,
) -> Result<Vec<BookingWithNames>> {
    let rows = sqlx::query_as::<_, BookingWithNames>(&format!(
        "{BOOKING_WITH_NAMES} WHERE b.consultant_id = $1 ORDER BY b.booking_date DESC"
    ))
    .bind(consultant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_pending_for_consultant(
    pool: &PgPool,
    consultant_id: Uuid,
) -> Result<Vec<BookingWithNames>> {
    let rows = sqlx::query_as::<_, BookingWithNames>(&format!(
        r#"
        {BOOKING_WITH_NAMES}
        WHERE b.consultant_id = $1
          AND b.status = 'PENDING'
        ORDER BY b.booking_date ASC
        "#
    ))
    .bind(consultant_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Bookings on `date` whose status still occupies a slot
/// (pending, approved or completed).
pub async fn list_blocking_bookings_on_date(
    pool: &PgPool,
    consultant_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<ConsultantBooking>> {
    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let day_end = day_start + chrono::Duration::days(1);
    let rows = sqlx::query_as::<_, ConsultantBooking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM consultant_bookings
        WHERE consultant_id = $1
          AND booking_date >= $2
          AND booking_date < $3
          AND status IN ('PENDING', 'APPROVED', 'COMPLETED')
        ORDER BY booking_date ASC
        "#
    ))
    .bind(consultant_id)
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ========== Stress assessments ==========

const ASSESSMENT_COLUMNS: &str = "id, employee_id, answers, pss_score, normalized_pss, \
                                  workload_stress_score, total_hours_worked, score, level, \
                                  share_with_supervisor, share_with_hr, created_at, updated_at";

pub async fn find_assessment(pool: &PgPool, employee_id: Uuid) -> Result<Option<StressAssessment>> {
    let row = sqlx::query_as::<_, StressAssessment>(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM stress_assessments WHERE employee_id = $1"
    ))
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub struct NewAssessment<'a> {
    pub employee_id: Uuid,
    pub answers: &'a [i16],
    pub pss_score: i32,
    pub normalized_pss: f64,
    pub workload_stress_score: f64,
    pub total_hours_worked: f64,
    pub score: f64,
    pub level: StressLevel,
    pub share_with_supervisor: bool,
    pub share_with_hr: bool,
}

/// One assessment per employee: resubmission overwrites in place.
pub async fn upsert_assessment(
    pool: &PgPool,
    assessment: &NewAssessment<'_>,
) -> Result<StressAssessment> {
    let row = sqlx::query_as::<_, StressAssessment>(&format!(
        r#"
        INSERT INTO stress_assessments (
            employee_id, answers, pss_score, normalized_pss, workload_stress_score,
            total_hours_worked, score, level, share_with_supervisor, share_with_hr
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (employee_id) DO UPDATE
        SET answers = EXCLUDED.answers,
            pss_score = EXCLUDED.pss_score,
            normalized_pss = EXCLUDED.normalized_pss,
            workload_stress_score = EXCLUDED.workload_stress_score,
            total_hours_worked = EXCLUDED.total_hours_worked,
            score = EXCLUDED.score,
            level = EXCLUDED.level,
            share_with_supervisor = EXCLUDED.share_with_supervisor,
            share_with_hr = EXCLUDED.share_with_hr,
            updated_at = NOW()
        RETURNING {ASSESSMENT_COLUMNS}
        "#
    ))
    .bind(assessment.employee_id)
    .bind(assessment.answers)
    .bind(assessment.pss_score)
    .bind(assessment.normalized_pss)
    .bind(assessment.workload_stress_score)
    .bind(assessment.total_hours_worked)
    .bind(assessment.score)
    .bind(assessment.level)
    .bind(assessment.share_with_supervisor)
    .bind(assessment.share_with_hr)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update_assessment_sharing(
    pool: &PgPool,
    employee_id: Uuid,
    share_with_supervisor: bool,
    share_with_hr: bool,
) -> Result<Option<StressAssessment>> {
    let row = sqlx::query_as::<_, StressAssessment>(&format!(
        r#"
        UPDATE stress_assessments
        SET share_with_supervisor = $2,
            share_with_hr = $3,
            updated_at = NOW()
        WHERE employee_id = $1
        RETURNING {ASSESSMENT_COLUMNS}
        "#
    ))
    .bind(employee_id)
    .bind(share_with_supervisor)
    .bind(share_with_hr)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct SharedScore {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub score: f64,
    pub level: StressLevel,
    pub updated_at: DateTime<Utc>,
}

/// Scores shared with a team's supervisor.
pub async fn list_shared_scores_for_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<SharedScore>> {
    let rows = sqlx::query_as::<_, SharedScore>(
        r#"
        SELECT s.employee_id, u.name AS employee_name, s.score, s.level, s.updated_at
        FROM stress_assessments s
        JOIN users u ON u.id = s.employee_id
        WHERE u.team_id = $1
          AND u.role = 'EMPLOYEE'
          AND u.is_active = true
          AND s.share_with_supervisor = true
        ORDER BY s.updated_at DESC
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Scores shared with HR, across all employees.
pub async fn list_shared_scores_for_hr(pool: &PgPool) -> Result<Vec<SharedScore>> {
    let rows = sqlx::query_as::<_, SharedScore>(
        r#"
        SELECT s.employee_id, u.name AS employee_name, s.score, s.level, s.updated_at
        FROM stress_assessments s
        JOIN users u ON u.id = s.employee_id
        WHERE u.role = 'EMPLOYEE'
          AND u.is_active = true
          AND s.share_with_hr = true
        ORDER BY s.updated_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ========== Tasks ==========

const TASK_COLUMNS: &str = "id, employee_id, assigned_by_id, title, description, status, \
                            priority, duration_minutes, due_date, created_at, updated_at";

pub struct NewTask<'a> {
    pub employee_id: Uuid,
    pub assigned_by_id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: TaskPriority,
    pub duration_minutes: i32,
    pub due_date: Option<NaiveDateTime>,
}

pub async fn insert_task(pool: &PgPool, task: &NewTask<'_>) -> Result<Task> {
    let row = sqlx::query_as::<_, Task>(&format!(
        r#"
        INSERT INTO tasks (employee_id, assigned_by_id, title, description, priority,
                           duration_minutes, due_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task.employee_id)
    .bind(task.assigned_by_id)
    .bind(task.title)
    .bind(task.description)
    .bind(task.priority)
    .bind(task.duration_minutes)
    .bind(task.due_date)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_tasks_for_employee(pool: &PgPool, employee_id: Uuid) -> Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE employee_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Tasks created since `since`, the scoring engine's 24-hour window input.
pub async fn list_tasks_created_since(
    pool: &PgPool,
    employee_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, Task>(&format!(
        r#"
        SELECT {TASK_COLUMNS}
        FROM tasks
        WHERE employee_id = $1
          AND created_at >= $2
        ORDER BY created_at DESC
        "#
    ))
    .bind(employee_id)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_task_for_employee(
    pool: &PgPool,
    task_id: Uuid,
    employee_id: Uuid,
) -> Result<Option<Task>> {
    let row = sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND employee_id = $2"
    ))
    .bind(task_id)
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Task owned by any employee of the given team (supervisor access path).
pub async fn find_task_in_team(pool: &PgPool, task_id: Uuid, team_id: Uuid) -> Result<Option<Task>> {
    let row = sqlx::query_as::<_, Task>(
        r#"
        SELECT t.id, t.employee_id, t.assigned_by_id, t.title, t.description, t.status,
               t.priority, t.duration_minutes, t.due_date, t.created_at, t.updated_at
        FROM tasks t
        JOIN users u ON u.id = t.employee_id
        WHERE t.id = $1
          AND u.team_id = $2
          AND u.role = 'EMPLOYEE'
        "#,
    )
    .bind(task_id)
    .bind(team_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn update_task(pool: &PgPool, task: &Task) -> Result<Task> {
    let row = sqlx::query_as::<_, Task>(&format!(
        r#"
        UPDATE tasks
        SET title = $2,
            description = $3,
            status = $4,
            priority = $5,
            duration_minutes = $6,
            due_date = $7,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {TASK_COLUMNS}
        "#
    ))
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.duration_minutes)
    .bind(task.due_date)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update_task_status(pool: &PgPool, task_id: Uuid, status: TaskStatus) -> Result<()> {
    sqlx::query("UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(task_id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_task(pool: &PgPool, task_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, serde::Serialize, FromRow)]
pub struct TaskWithNames {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub assigned_by_id: Uuid,
    pub assigned_by_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub duration_minutes: i32,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_tasks_for_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<TaskWithNames>> {
    let rows = sqlx::query_as::<_, TaskWithNames>(
        r#"
        SELECT t.id, t.employee_id, e.name AS employee_name,
               t.assigned_by_id, a.name AS assigned_by_name,
               t.title, t.description, t.status, t.priority, t.duration_minutes,
               t.due_date, t.created_at, t.updated_at
        FROM tasks t
        JOIN users e ON e.id = t.employee_id
        JOIN users a ON a.id = t.assigned_by_id
        WHERE e.team_id = $1
          AND e.role = 'EMPLOYEE'
        ORDER BY t.created_at DESC
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ========== Notifications ==========

pub async fn insert_notification(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    notification_type: NotificationType,
    related_booking_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, notification_type, related_booking_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(notification_type)
    .bind(related_booking_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_notifications(pool: &PgPool, user_id: Uuid) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, message, notification_type, related_booking_id,
               is_read, created_at
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn unread_notification_count(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn mark_notification_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_notifications_read(pool: &PgPool, user_id: Uuid) -> Result<u64> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false")
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
