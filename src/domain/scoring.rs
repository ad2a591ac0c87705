//! Work-stress scoring: PSS-10 questionnaire scoring combined with a
//! workload component derived from the employee's recent tasks.
use crate::domain::models::{StressLevel, Task, TaskPriority, TaskStatus};
use crate::error::AppError;
use chrono::NaiveDateTime;
use serde::Serialize;

/// PSS-10 questions, phrased for a 24-hour recall window.
pub const STRESS_QUESTIONS: [&str; 10] = [
    "During the past 24 hours, how often did you feel like this? Something happened that surprised or upset you.",
    "During the past 24 hours, how often did you feel like this? You felt like you couldn't control important things in your life.",
    "During the past 24 hours, how often did you feel like this? You felt nervous or stressed.",
    "During the past 24 hours, how often did you feel like this? You felt sure you could solve your problems.",
    "During the past 24 hours, how often did you feel like this? Things were going well for you.",
    "During the past 24 hours, how often did you feel like this? You had too many things to do and felt you couldn't manage.",
    "During the past 24 hours, how often did you feel like this? You were able to stay calm when something annoyed you.",
    "During the past 24 hours, how often did you feel like this? You felt in control of your day.",
    "During the past 24 hours, how often did you feel like this? You got angry about things you couldn't control.",
    "During the past 24 hours, how often did you feel like this? You felt like problems were too much for you.",
];

pub const ANSWER_INSTRUCTIONS: &str = "Rate how often you have felt or thought a certain way during the past 24 hours: 0=Never, 1=Almost Never, 2=Sometimes, 3=Often, 4=Very Often";

/// Positively-worded items (0-indexed) scored as `4 - answer`.
const REVERSE_SCORED: [usize; 4] = [3, 4, 6, 7];

/// Full-Time-Equivalent reference workday, in hours.
const FTE_STANDARD_HOURS: f64 = 7.22;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PssScore {
    /// Raw sum over the ten items, 0..=40.
    pub raw: i32,
    /// Raw score projected onto a 0..=10 scale.
    pub normalized: f64,
}

pub fn calculate_pss_score(answers: &[i16]) -> Result<PssScore, AppError> {
    if answers.len() != STRESS_QUESTIONS.len() {
        return Err(AppError::Validation(
            "Must provide exactly 10 answers".to_string(),
        ));
    }
    if answers.iter().any(|answer| !(0..=4).contains(answer)) {
        return Err(AppError::Validation(
            "Answers must be between 0 and 4".to_string(),
        ));
    }

    let raw: i32 = answers
        .iter()
        .enumerate()
        .map(|(idx, &answer)| {
            if REVERSE_SCORED.contains(&idx) {
                4 - i32::from(answer)
            } else {
                i32::from(answer)
            }
        })
        .sum();

    Ok(PssScore {
        raw,
        normalized: f64::from(raw) / 40.0 * 10.0,
    })
}

/// Workload component with the per-factor breakdown exposed by the
/// workload-details endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadBreakdown {
    pub total_tasks: usize,
    pub high_priority_tasks: usize,
    pub overdue_tasks: usize,
    pub pending_tasks: usize,
    pub completed_tasks: usize,
    pub fte_standard: f64,
    pub total_hours_worked: f64,
    pub raw_workload_score: f64,
    pub priority_stress: f64,
    pub overdue_stress: f64,
    pub pending_stress: f64,
    pub total_workload_stress: f64,
    pub normalized_workload_stress: f64,
}

/// Score the workload over `tasks` (the caller supplies the 24-hour window).
/// `now` is the wall-clock reference used for the overdue check.
pub fn calculate_workload_stress(tasks: &[Task], now: NaiveDateTime) -> WorkloadBreakdown {
    let total_hours_worked: f64 = tasks
        .iter()
        .map(|task| f64::from(task.duration_minutes) / 60.0)
        .sum();

    let high_priority_tasks = tasks
        .iter()
        .filter(|task| task.priority == TaskPriority::High)
        .count();
    let pending_tasks = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Pending)
        .count();
    let overdue_tasks = tasks
        .iter()
        .filter(|task| {
            task.status == TaskStatus::Pending
                && task.due_date.map(|due| due < now).unwrap_or(false)
        })
        .count();

    // Base band against the FTE reference. The cut points are deliberate and
    // must not be "cleaned up" into contiguous ranges.
    let raw_workload_score = if total_hours_worked < FTE_STANDARD_HOURS {
        0.0
    } else if (7.23..=9.0).contains(&total_hours_worked) {
        0.5
    } else if (9.01..=11.99).contains(&total_hours_worked) {
        1.0
    } else {
        2.0
    };

    let priority_stress = (high_priority_tasks as f64 * 0.1).min(0.5);
    let overdue_stress = (overdue_tasks as f64 * 0.2).min(0.5);
    let pending_stress = (pending_tasks as f64 * 0.05).min(0.3);

    let total_workload_stress =
        (raw_workload_score + priority_stress + overdue_stress + pending_stress).min(2.0);
    let normalized_workload_stress = total_workload_stress / 2.0 * 10.0;

    WorkloadBreakdown {
        total_tasks: tasks.len(),
        high_priority_tasks,
        overdue_tasks,
        pending_tasks,
        completed_tasks: tasks.len() - pending_tasks,
        fte_standard: FTE_STANDARD_HOURS,
        total_hours_worked,
        raw_workload_score,
        priority_stress,
        overdue_stress,
        pending_stress,
        total_workload_stress,
        normalized_workload_stress,
    }
}

/// Weighted blend of the two normalized components, 0..=10.
pub fn calculate_final_score(normalized_pss: f64, normalized_workload: f64) -> (f64, StressLevel) {
    let score = normalized_pss * 0.7 + normalized_workload * 0.3;
    (score, StressLevel::from_score(score))
}

impl StressLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 3.0 {
            StressLevel::Low
        } else if score <= 6.0 {
            StressLevel::Moderate
        } else if score <= 8.5 {
            StressLevel::High
        } else {
            StressLevel::Critical
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Task, TaskPriority, TaskStatus};
    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    fn task(
        duration_minutes: i32,
        priority: TaskPriority,
        status: TaskStatus,
        due_date: Option<NaiveDateTime>,
    ) -> Task {
        Task {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            assigned_by_id: Uuid::new_v4(),
            title: "task".to_string(),
            description: None,
            status,
            priority,
            duration_minutes,
            due_date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn pss_rejects_wrong_answer_count() {
        assert!(calculate_pss_score(&[0; 9]).is_err());
        assert!(calculate_pss_score(&[0; 11]).is_err());
    }

    #[test]
    fn pss_rejects_out_of_range_answers() {
        let mut answers = [2i16; 10];
        answers[5] = 5;
        assert!(calculate_pss_score(&answers).is_err());
        answers[5] = -1;
        assert!(calculate_pss_score(&answers).is_err());
    }

    #[test]
    fn pss_reverse_scores_positive_items() {
        // A zero on each positively-worded item contributes 4 to the raw sum.
        let answers = [0i16; 10];
        let score = calculate_pss_score(&answers).unwrap();
        assert_eq!(score.raw, 16);
        assert!((score.normalized - 4.0).abs() < 1e-9);

        // Maxing only the reverse-scored items zeroes their contribution.
        let mut answers = [0i16; 10];
        for idx in [3, 4, 6, 7] {
            answers[idx] = 4;
        }
        assert_eq!(calculate_pss_score(&answers).unwrap().raw, 0);
    }

    #[test]
    fn pss_stays_in_range_for_extremes() {
        let mut all_fours = [4i16; 10];
        let score = calculate_pss_score(&all_fours).unwrap();
        assert_eq!(score.raw, 24);

        // Worst case: 4 on negative items, 0 on positive items.
        for idx in [3, 4, 6, 7] {
            all_fours[idx] = 0;
        }
        let worst = calculate_pss_score(&all_fours).unwrap();
        assert_eq!(worst.raw, 40);
        assert!((worst.normalized - 10.0).abs() < 1e-9);
    }

    #[test]
    fn workload_base_bands() {
        let cases = [
            (60 * 4, 0.0),   // 4h, under FTE
            (433, 0.0),      // 7.216h, just under
            (480, 0.5),      // 8h
            (540, 0.5),      // exactly 9.00h stays in the middle band
            (600, 1.0),      // 10h
            (60 * 13, 2.0),  // 13h
        ];
        for (minutes, expected) in cases {
            let tasks = vec![task(minutes, TaskPriority::Low, TaskStatus::Completed, None)];
            let breakdown = calculate_workload_stress(&tasks, now());
            assert_eq!(
                breakdown.raw_workload_score, expected,
                "minutes={minutes}"
            );
        }
    }

    #[test]
    fn workload_penalties_are_capped() {
        let overdue = Some(now() - Duration::hours(1));
        let tasks: Vec<Task> = (0..20)
            .map(|_| task(10, TaskPriority::High, TaskStatus::Pending, overdue))
            .collect();
        let breakdown = calculate_workload_stress(&tasks, now());
        assert_eq!(breakdown.priority_stress, 0.5);
        assert_eq!(breakdown.overdue_stress, 0.5);
        assert_eq!(breakdown.pending_stress, 0.3);
        assert!(breakdown.total_workload_stress <= 2.0);
        assert!(breakdown.normalized_workload_stress <= 10.0);
    }

    #[test]
    fn workload_total_never_exceeds_cap() {
        let overdue = Some(now() - Duration::hours(2));
        let tasks: Vec<Task> = (0..30)
            .map(|_| task(60, TaskPriority::High, TaskStatus::Pending, overdue))
            .collect();
        let breakdown = calculate_workload_stress(&tasks, now());
        assert_eq!(breakdown.total_workload_stress, 2.0);
        assert_eq!(breakdown.normalized_workload_stress, 10.0);
    }

    #[test]
    fn workload_counts_only_pending_overdue() {
        let past = Some(now() - Duration::hours(1));
        let tasks = vec![
            task(30, TaskPriority::Low, TaskStatus::Completed, past),
            task(30, TaskPriority::Low, TaskStatus::Pending, past),
            task(30, TaskPriority::Low, TaskStatus::Pending, Some(now() + Duration::hours(1))),
            task(30, TaskPriority::Low, TaskStatus::Pending, None),
        ];
        let breakdown = calculate_workload_stress(&tasks, now());
        assert_eq!(breakdown.overdue_tasks, 1);
        assert_eq!(breakdown.pending_tasks, 3);
        assert_eq!(breakdown.completed_tasks, 1);
    }

    #[test]
    fn final_score_blends_and_bounds() {
        let (zero, level) = calculate_final_score(0.0, 0.0);
        assert_eq!(zero, 0.0);
        assert_eq!(level, StressLevel::Low);

        let (ten, level) = calculate_final_score(10.0, 10.0);
        assert!((ten - 10.0).abs() < 1e-9);
        assert_eq!(level, StressLevel::Critical);
    }

    #[test]
    fn level_thresholds_are_inclusive_upper_bounds() {
        assert_eq!(StressLevel::from_score(3.0), StressLevel::Low);
        assert_eq!(StressLevel::from_score(3.01), StressLevel::Moderate);
        assert_eq!(StressLevel::from_score(6.0), StressLevel::Moderate);
        assert_eq!(StressLevel::from_score(6.01), StressLevel::High);
        assert_eq!(StressLevel::from_score(8.5), StressLevel::High);
        assert_eq!(StressLevel::from_score(8.51), StressLevel::Critical);
    }
}
