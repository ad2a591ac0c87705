use crate::db;
use crate::domain::models::UserRole;
use crate::domain::scoring::{self, ANSWER_INSTRUCTIONS, STRESS_QUESTIONS};
use crate::error::AppError;
use crate::state::SharedState;
use crate::web::session::Auth;
use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

/// Roles that submit assessments and manage their own score.
const STAFF: &[UserRole] = &[UserRole::Employee, UserRole::Supervisor, UserRole::HrManager];

#[derive(Deserialize)]
pub struct AssessmentPayload {
    pub answers: Vec<i16>,
    #[serde(default)]
    pub share_with_supervisor: bool,
    #[serde(default)]
    pub share_with_hr: bool,
}

#[derive(Deserialize)]
pub struct SharingPayload {
    pub share_with_supervisor: Option<bool>,
    pub share_with_hr: Option<bool>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/questions", get(questions))
        .route("/submit-assessment", post(submit_assessment))
        .route("/my-score", get(my_score))
        .route("/workload-details", get(workload_details))
        .route("/update-sharing", put(update_sharing))
        .route("/team-scores", get(team_scores))
        .with_state(state)
}

async fn questions() -> Json<Value> {
    Json(json!({
        "questions": STRESS_QUESTIONS,
        "instructions": ANSWER_INSTRUCTIONS,
    }))
}

/// Supervisors cannot share upward with a supervisor; HR managers cannot
/// share at all.
fn enforce_sharing_policy(
    role: UserRole,
    share_with_supervisor: bool,
    share_with_hr: bool,
) -> (bool, bool) {
    match role {
        UserRole::Supervisor => (false, share_with_hr),
        UserRole::HrManager => (false, false),
        _ => (share_with_supervisor, share_with_hr),
    }
}

async fn submit_assessment(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<AssessmentPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;

    let pss = scoring::calculate_pss_score(&payload.answers)?;

    let window_start = Utc::now() - Duration::days(1);
    let tasks = db::list_tasks_created_since(&state.pool, claims.user_id, window_start).await?;
    let workload = scoring::calculate_workload_stress(&tasks, Utc::now().naive_utc());

    let (score, level) =
        scoring::calculate_final_score(pss.normalized, workload.normalized_workload_stress);

    let (share_with_supervisor, share_with_hr) = enforce_sharing_policy(
        claims.role,
        payload.share_with_supervisor,
        payload.share_with_hr,
    );

    let assessment = db::upsert_assessment(
        &state.pool,
        &db::NewAssessment {
            employee_id: claims.user_id,
            answers: &payload.answers,
            pss_score: pss.raw,
            normalized_pss: pss.normalized,
            workload_stress_score: workload.normalized_workload_stress,
            total_hours_worked: workload.total_hours_worked,
            score,
            level,
            share_with_supervisor,
            share_with_hr,
        },
    )
    .await?;

    Ok(Json(json!({
        "message": "Stress assessment submitted successfully",
        "id": assessment.id,
        "score": assessment.score,
        "level": assessment.level,
        "pss_score": assessment.pss_score,
        "normalized_pss": assessment.normalized_pss,
        "workload_stress_score": assessment.workload_stress_score,
        "total_hours_worked": assessment.total_hours_worked,
    })))
}

async fn my_score(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;

    match db::find_assessment(&state.pool, claims.user_id).await? {
        Some(assessment) => Ok(Json(json!({
            "id": assessment.id,
            "score": assessment.score,
            "level": assessment.level,
            "pss_score": assessment.pss_score,
            "normalized_pss": assessment.normalized_pss,
            "workload_stress_score": assessment.workload_stress_score,
            "total_hours_worked": assessment.total_hours_worked,
            "share_with_supervisor": assessment.share_with_supervisor,
            "share_with_hr": assessment.share_with_hr,
            "created_at": assessment.created_at,
            "updated_at": assessment.updated_at,
        }))),
        None => Ok(Json(json!({
            "message": "No stress assessment completed yet"
        }))),
    }
}

async fn workload_details(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<scoring::WorkloadBreakdown>, AppError> {
    claims.require(STAFF)?;

    let window_start = Utc::now() - Duration::days(1);
    let tasks = db::list_tasks_created_since(&state.pool, claims.user_id, window_start).await?;
    Ok(Json(scoring::calculate_workload_stress(
        &tasks,
        Utc::now().naive_utc(),
    )))
}

async fn update_sharing(
    Auth(claims): Auth,
    State(state): State<SharedState>,
    Json(payload): Json<SharingPayload>,
) -> Result<Json<Value>, AppError> {
    claims.require(STAFF)?;

    let existing = db::find_assessment(&state.pool, claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No stress assessment found".to_string()))?;

    let (share_with_supervisor, share_with_hr) = enforce_sharing_policy(
        claims.role,
        payload
            .share_with_supervisor
            .unwrap_or(existing.share_with_supervisor),
        payload.share_with_hr.unwrap_or(existing.share_with_hr),
    );

    let updated = db::update_assessment_sharing(
        &state.pool,
        claims.user_id,
        share_with_supervisor,
        share_with_hr,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("No stress assessment found".to_string()))?;

    Ok(Json(json!({
        "message": "Sharing preferences updated successfully",
        "share_with_supervisor": updated.share_with_supervisor,
        "share_with_hr": updated.share_with_hr,
    })))
}

/// Scores visible to the caller: a supervisor sees their team's shared
/// scores, HR sees every employee's HR-shared score.
async fn team_scores(
    Auth(claims): Auth,
    State(state): State<SharedState>,
) -> Result<Json<Value>, AppError> {
    claims.require(&[UserRole::Supervisor, UserRole::HrManager])?;

    let (total_members, scores) = match claims.role {
        UserRole::Supervisor => {
            let me = db::find_user_by_id(&state.pool, claims.user_id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
            match me.team_id {
                Some(team_id) => {
                    let members = db::list_employees_in_team(&state.pool, team_id).await?;
                    let scores = db::list_shared_scores_for_team(&state.pool, team_id).await?;
                    (members.len(), scores)
                }
                None => (0, Vec::new()),
            }
        }
        _ => {
            let members = db::list_users_by_role(&state.pool, UserRole::Employee).await?;
            let scores = db::list_shared_scores_for_hr(&state.pool).await?;
            (members.len(), scores)
        }
    };

    let shared_count = scores.len();
    Ok(Json(json!({
        "team_scores": scores,
        "total_members": total_members,
        "shared_scores": shared_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisors_never_share_with_supervisor() {
        assert_eq!(
            enforce_sharing_policy(UserRole::Supervisor, true, true),
            (false, true)
        );
    }

    #[test]
    fn hr_managers_never_share() {
        assert_eq!(
            enforce_sharing_policy(UserRole::HrManager, true, true),
            (false, false)
        );
    }

    #[test]
    fn employees_keep_their_choices() {
        assert_eq!(
            enforce_sharing_policy(UserRole::Employee, true, false),
            (true, false)
        );
        assert_eq!(
            enforce_sharing_policy(UserRole::Employee, false, true),
            (false, true)
        );
    }
}
