use crate::app::ports::MarksApi;
use crate::error::{ApiError, Result, UploadError};
use crate::types::{
    AcademicMisconductRow, Class, EntityId, MarkRow, NewAcademicMisconduct, NewMark,
    NewPersonalCircumstance, NewStudent, PersonalCircumstanceRow, Student, UploadKind,
};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What happened to one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    /// The row's record was created; for marks, possibly after creating the student
    Created { student_created: bool },
    /// A mark for this student and class was already uploaded; nothing written
    AlreadyExists,
    /// The row could not be recorded because a referenced entity is missing
    Skipped { reason: String },
    /// An API call failed
    Failed { error: String },
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Created { .. } => "created",
            RowStatus::AlreadyExists => "already_exists",
            RowStatus::Skipped { .. } => "skipped",
            RowStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    /// Line number in the uploaded file
    pub row: usize,
    pub reg_no: String,
    #[serde(flatten)]
    pub status: RowStatus,
}

enum StudentResolution {
    Existing(Student),
    Created(Student),
    DegreeMissing,
}

/// Applies validated rows to the marks API one at a time, in file order.
/// Row-level problems become `RowOutcome`s; only a class that cannot be
/// resolved stops a marks batch.
pub struct Reconciler {
    api: Arc<dyn MarksApi>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("api", &"<Arc<dyn MarksApi>>")
            .finish()
    }
}

impl Reconciler {
    pub fn new(api: Arc<dyn MarksApi>) -> Self {
        Self { api }
    }

    fn ensure_credential(&self) -> Result<()> {
        if self.api.has_credential() {
            Ok(())
        } else {
            Err(UploadError::MissingCredential)
        }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn reconcile_marks(&self, rows: &[MarkRow]) -> Result<Vec<RowOutcome>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        self.ensure_credential()?;

        // every row shares the first row's class
        let class = self.resolve_class(&first.class_code).await?;
        info!("Reconciling {} marks for class {} ({})", rows.len(), class.code, class.id);

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let status = match self.reconcile_mark_row(row, class.id).await {
                Ok(status) => status,
                Err(error) => RowStatus::Failed { error },
            };
            outcomes.push(record_outcome(UploadKind::StudentMarks, row.line, &row.reg_no, status));
        }
        Ok(outcomes)
    }

    async fn resolve_class(&self, code: &str) -> Result<Class> {
        match self.api.get_class_by_code(code).await {
            Ok(Some(class)) => Ok(class),
            Ok(None) => {
                warn!("Class {} not found, nothing uploaded", code);
                Err(UploadError::ClassNotFound(code.to_string()))
            }
            Err(source) => Err(UploadError::ClassLookup {
                code: code.to_string(),
                source,
            }),
        }
    }

    async fn reconcile_mark_row(&self, row: &MarkRow, class_id: EntityId) -> std::result::Result<RowStatus, String> {
        let (student, student_created) = match self.resolve_student(row).await? {
            StudentResolution::Existing(student) => (student, false),
            StudentResolution::Created(student) => (student, true),
            StudentResolution::DegreeMissing => {
                return Ok(RowStatus::Skipped {
                    reason: format!(
                        "student {} does not exist and degree '{}' ({}) was not found",
                        row.reg_no, row.degree_name, row.degree_level
                    ),
                });
            }
        };

        let existing = self
            .api
            .get_mark(student.id, class_id)
            .await
            .map_err(|e| failed("looking up mark", e))?;
        if let Some(mark) = existing {
            debug!("Mark {} already exists for {}", mark.id, row.reg_no);
            return Ok(RowStatus::AlreadyExists);
        }

        let new_mark = NewMark {
            mark: row.mark,
            student_id: student.id,
            class_id,
            mark_code: row.mark_code,
        };
        let created = self
            .api
            .create_mark(&new_mark)
            .await
            .map_err(|e| failed("creating mark", e))?;
        debug!("Created mark {} for {}", created.id, row.reg_no);
        Ok(RowStatus::Created { student_created })
    }

    async fn resolve_student(&self, row: &MarkRow) -> std::result::Result<StudentResolution, String> {
        let existing = self
            .api
            .get_student_by_reg_no(&row.reg_no)
            .await
            .map_err(|e| failed("looking up student", e))?;
        if let Some(student) = existing {
            return Ok(StudentResolution::Existing(student));
        }

        let degree = self
            .api
            .get_degree_by_name(&row.degree_name)
            .await
            .map_err(|e| failed("looking up degree", e))?;
        let Some(degree) = degree else {
            warn!("Degree '{}' not found for new student {}", row.degree_name, row.reg_no);
            return Ok(StudentResolution::DegreeMissing);
        };

        let new_student = NewStudent {
            reg_no: row.reg_no.clone(),
            name: row.student_name.clone(),
            degree_id: degree.id,
        };
        let student = self
            .api
            .create_student(&new_student)
            .await
            .map_err(|e| failed("creating student", e))?;
        info!("Created student {} ({}) in degree {}", student.reg_no, student.id, degree.name);
        Ok(StudentResolution::Created(student))
    }

    /// Always creates a new record; there is no duplicate check.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn reconcile_personal_circumstances(
        &self,
        rows: &[PersonalCircumstanceRow],
    ) -> Result<Vec<RowOutcome>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_credential()?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let record = NewPersonalCircumstance {
                reg_no: row.reg_no.clone(),
                details: row.details.clone(),
                semester: row.semester.clone(),
                cat: row.category,
                comments: row.comments.clone(),
            };
            let status = match self.api.create_personal_circumstance(&record).await {
                Ok(_) => RowStatus::Created { student_created: false },
                Err(e) => RowStatus::Failed {
                    error: failed("creating personal circumstance", e),
                },
            };
            outcomes.push(record_outcome(UploadKind::PersonalCircumstances, row.line, &row.reg_no, status));
        }
        Ok(outcomes)
    }

    /// Always creates a new record, with the outcome upper-cased.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn reconcile_academic_misconducts(
        &self,
        rows: &[AcademicMisconductRow],
    ) -> Result<Vec<RowOutcome>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_credential()?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let record = NewAcademicMisconduct {
                date: row.date.clone(),
                class_code: row.module_code.clone(),
                reg_no: row.reg_no.clone(),
                outcome: row.outcome.to_uppercase(),
            };
            let status = match self.api.create_academic_misconduct(&record).await {
                Ok(_) => RowStatus::Created { student_created: false },
                Err(e) => RowStatus::Failed {
                    error: failed("creating academic misconduct", e),
                },
            };
            outcomes.push(record_outcome(UploadKind::AcademicMisconducts, row.line, &row.reg_no, status));
        }
        Ok(outcomes)
    }
}

fn failed(step: &str, err: ApiError) -> String {
    format!("{} failed: {}", step, err)
}

fn record_outcome(kind: UploadKind, line: usize, reg_no: &str, status: RowStatus) -> RowOutcome {
    counter!("mark_uploader_rows_total", "kind" => kind.as_str(), "status" => status.label()).increment(1);
    match &status {
        RowStatus::Failed { error } => warn!(row = line, reg_no, "Row failed: {}", error),
        other => debug!(row = line, reg_no, "Row {}", other.label()),
    }
    RowOutcome {
        row: line,
        reg_no: reg_no.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::in_memory::{ApiCall, InMemoryMarksApi};

    fn mark_row(line: usize, reg_no: &str, mark: u8) -> MarkRow {
        MarkRow {
            line,
            class_code: "CS408".into(),
            reg_no: reg_no.into(),
            mark,
            student_name: "Grace Hopper".into(),
            degree_level: "BSc".into(),
            degree_name: "Computer Science".into(),
            mark_code: None,
        }
    }

    #[tokio::test]
    async fn creates_missing_student_then_mark() {
        let api = Arc::new(InMemoryMarksApi::new());
        let class_id = api.add_class("CS408");
        api.add_degree("Computer Science");

        let reconciler = Reconciler::new(api.clone());
        let outcomes = reconciler.reconcile_marks(&[mark_row(2, "B1", 64)]).await.unwrap();

        assert_eq!(outcomes[0].status, RowStatus::Created { student_created: true });
        assert_eq!(outcomes[0].row, 2);
        let student = api.student("B1").unwrap();
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::GetClass("CS408".into()),
                ApiCall::GetStudent("B1".into()),
                ApiCall::GetDegree("Computer Science".into()),
                ApiCall::CreateStudent("B1".into()),
                ApiCall::GetMark(student.id, class_id),
                ApiCall::CreateMark(student.id, class_id),
            ]
        );
    }

    #[tokio::test]
    async fn missing_degree_skips_row_but_not_batch() {
        let api = Arc::new(InMemoryMarksApi::new());
        let class_id = api.add_class("CS408");
        let existing = api.add_student("B2", "Alan Turing", None);

        let reconciler = Reconciler::new(api.clone());
        let outcomes = reconciler
            .reconcile_marks(&[mark_row(2, "B1", 64), mark_row(3, "B2", 70)])
            .await
            .unwrap();

        assert!(matches!(outcomes[0].status, RowStatus::Skipped { .. }));
        assert_eq!(outcomes[1].status, RowStatus::Created { student_created: false });
        assert_eq!(api.create_calls(), vec![ApiCall::CreateMark(existing, class_id)]);
    }

    #[tokio::test]
    async fn unexpected_error_fails_only_that_row() {
        let api = Arc::new(InMemoryMarksApi::new());
        api.add_class("CS408");
        api.add_student("B1", "A", None);
        api.add_student("B2", "B", None);
        api.fail_call(
            ApiCall::GetStudent("B1".into()),
            ApiError::Status { status: 500, message: "down".into() },
        );

        let outcomes = Reconciler::new(api.clone())
            .reconcile_marks(&[mark_row(2, "B1", 10), mark_row(3, "B2", 20)])
            .await
            .unwrap();

        assert_eq!(
            outcomes[0].status,
            RowStatus::Failed {
                error: "looking up student failed: API responded with status 500: down".into()
            }
        );
        assert_eq!(outcomes[1].status, RowStatus::Created { student_created: false });
    }

    #[tokio::test]
    async fn failed_create_is_reported_on_its_own_line() {
        let api = Arc::new(InMemoryMarksApi::new());
        let class_id = api.add_class("CS408");
        let first = api.add_student("B1", "A", None);
        api.add_student("B2", "B", None);
        api.fail_call(
            ApiCall::CreateMark(first, class_id),
            ApiError::Status { status: 503, message: "busy".into() },
        );

        let outcomes = Reconciler::new(api.clone())
            .reconcile_marks(&[mark_row(5, "B1", 10), mark_row(9, "B2", 20)])
            .await
            .unwrap();

        assert_eq!(outcomes[0].row, 5);
        assert_eq!(
            outcomes[0].status,
            RowStatus::Failed {
                error: "creating mark failed: API responded with status 503: busy".into()
            }
        );
        assert_eq!(outcomes[1].row, 9);
        assert_eq!(outcomes[1].status, RowStatus::Created { student_created: false });
        assert_eq!(api.marks().len(), 1);
    }

    #[tokio::test]
    async fn class_lookup_error_aborts_batch() {
        let api = Arc::new(InMemoryMarksApi::new());
        api.fail_call(ApiCall::GetClass("CS408".into()), ApiError::Transport("refused".into()));

        let err = Reconciler::new(api.clone())
            .reconcile_marks(&[mark_row(2, "B1", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::ClassLookup { ref code, .. } if code == "CS408"));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn misconduct_outcome_is_uppercased() {
        let api = Arc::new(InMemoryMarksApi::new());
        let rows = vec![AcademicMisconductRow {
            line: 2,
            date: "2024-03-01".into(),
            reg_no: "B1".into(),
            module_code: "0408".into(),
            module_name: "Operating Systems".into(),
            outcome: "Under Investigation".into(),
        }];

        Reconciler::new(api.clone()).reconcile_academic_misconducts(&rows).await.unwrap();

        let created = api.academic_misconducts();
        assert_eq!(created[0].outcome.as_deref(), Some("UNDER INVESTIGATION"));
        assert_eq!(created[0].class_code.as_deref(), Some("0408"));
    }

    #[tokio::test]
    async fn no_credential_means_no_calls() {
        let api = Arc::new(InMemoryMarksApi::without_credential());
        let err = Reconciler::new(api.clone())
            .reconcile_marks(&[mark_row(2, "B1", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingCredential));
        assert!(api.calls().is_empty());
    }
}
