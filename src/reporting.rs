use crate::app::ports::Notification;
use crate::reconcile::{RowOutcome, RowStatus};
use crate::types::UploadKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

fn noun(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::StudentMarks => "marks",
        UploadKind::PersonalCircumstances => "personal circumstances",
        UploadKind::AcademicMisconducts => "academic misconducts",
    }
}

/// Notifications for a reconciled batch: one per row that was not created,
/// in row order, or a single success message when every row was created.
pub fn notifications_for(kind: UploadKind, outcomes: &[RowOutcome]) -> Vec<Notification> {
    let problems: Vec<Notification> = outcomes
        .iter()
        .filter_map(|o| match &o.status {
            RowStatus::Created { .. } => None,
            RowStatus::AlreadyExists => Some(Notification::warning(format!(
                "Row {}: mark for {} has already been uploaded",
                o.row, o.reg_no
            ))),
            RowStatus::Skipped { reason } => {
                Some(Notification::error(format!("Row {}: {}", o.row, reason)))
            }
            RowStatus::Failed { error } => {
                Some(Notification::error(format!("Row {}: {}", o.row, error)))
            }
        })
        .collect();

    if problems.is_empty() {
        vec![Notification::success(format!(
            "Uploaded {} {} successfully",
            outcomes.len(),
            noun(kind)
        ))]
    } else {
        problems
    }
}

/// Summary of one upload run
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub run_id: Uuid,
    pub kind: UploadKind,
    pub file_name: String,
    pub file_sha256: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_rows: usize,
    pub created: usize,
    pub students_created: usize,
    pub already_exists: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<RowOutcome>,
}

impl UploadReport {
    pub fn new(
        run_id: Uuid,
        kind: UploadKind,
        file_name: String,
        file_sha256: String,
        started_at: DateTime<Utc>,
        outcomes: Vec<RowOutcome>,
    ) -> Self {
        let mut report = Self {
            run_id,
            kind,
            file_name,
            file_sha256,
            started_at,
            finished_at: Utc::now(),
            total_rows: outcomes.len(),
            created: 0,
            students_created: 0,
            already_exists: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
        };
        for outcome in &outcomes {
            match outcome.status {
                RowStatus::Created { student_created } => {
                    report.created += 1;
                    if student_created {
                        report.students_created += 1;
                    }
                }
                RowStatus::AlreadyExists => report.already_exists += 1,
                RowStatus::Skipped { .. } => report.skipped += 1,
                RowStatus::Failed { .. } => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// Every row was created
    pub fn is_clean(&self) -> bool {
        self.created == self.total_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::NotificationLevel;

    fn outcome(row: usize, status: RowStatus) -> RowOutcome {
        RowOutcome { row, reg_no: format!("B{}", row), status }
    }

    #[test]
    fn single_success_when_all_created() {
        let outcomes = vec![
            outcome(2, RowStatus::Created { student_created: false }),
            outcome(3, RowStatus::Created { student_created: true }),
        ];
        let notes = notifications_for(UploadKind::StudentMarks, &outcomes);
        assert_eq!(notes, vec![Notification::success("Uploaded 2 marks successfully")]);
    }

    #[test]
    fn one_notification_per_problem_row_in_order() {
        let outcomes = vec![
            outcome(2, RowStatus::AlreadyExists),
            outcome(3, RowStatus::Created { student_created: false }),
            outcome(4, RowStatus::Failed { error: "creating mark failed: x".into() }),
        ];
        let notes = notifications_for(UploadKind::StudentMarks, &outcomes);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].level, NotificationLevel::Warning);
        assert_eq!(notes[0].message, "Row 2: mark for B2 has already been uploaded");
        assert_eq!(notes[1].message, "Row 4: creating mark failed: x");
    }

    #[test]
    fn report_counts_each_status() {
        let report = UploadReport::new(
            Uuid::new_v4(),
            UploadKind::StudentMarks,
            "marks.csv".into(),
            String::new(),
            Utc::now(),
            vec![
                outcome(2, RowStatus::Created { student_created: true }),
                outcome(3, RowStatus::AlreadyExists),
                outcome(4, RowStatus::Skipped { reason: "no degree".into() }),
            ],
        );
        assert_eq!(
            (report.created, report.students_created, report.already_exists, report.skipped, report.failed),
            (1, 1, 1, 1, 0)
        );
        assert!(!report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "student_marks");
        assert_eq!(json["outcomes"][1]["status"], "already_exists");
        assert_eq!(json["outcomes"][2]["reason"], "no degree");
    }
}
