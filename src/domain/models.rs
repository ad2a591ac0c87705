use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Employee,
    Supervisor,
    Psychiatrist,
    HrManager,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "stress_level", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingCreated,
    BookingApproved,
    BookingRejected,
    BookingCancelled,
    SessionCompleted,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub role: UserRole,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Consultant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub qualifications: String,
    pub registration_number: String,
    pub hospital: String,
    pub specialization: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConsultantAvailability {
    pub id: Uuid,
    pub consultant_id: Uuid,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConsultantBooking {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub employee_id: Uuid,
    pub booked_by_id: Uuid,
    /// Wall-clock time; stored and compared without timezone conversion.
    pub booking_date: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StressAssessment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub answers: Vec<i16>,
    pub pss_score: i32,
    pub normalized_pss: f64,
    pub workload_stress_score: f64,
    pub total_hours_worked: f64,
    pub score: f64,
    pub level: StressLevel,
    pub share_with_supervisor: bool,
    pub share_with_hr: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub assigned_by_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub duration_minutes: i32,
    pub due_date: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub related_booking_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
