use crate::app::ports::{MarksApi, Notification, Notifier};
use crate::error::{Result, UploadError};
use crate::parser::{normalize_keys, read_upload, UploadLimits, UploadSource};
use crate::reconcile::Reconciler;
use crate::reporting::{notifications_for, UploadReport};
use crate::types::UploadKind;
use crate::validation::{validate_rows, ValidatedBatch};
use chrono::Utc;
use metrics::{counter, histogram};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// One upload invocation: parse, normalize, validate, reconcile, report.
/// Each stage runs once and a batch-level failure stops the run.
pub struct UploadPipeline {
    api: Arc<dyn MarksApi>,
    notifier: Arc<dyn Notifier>,
    limits: UploadLimits,
}

impl UploadPipeline {
    pub fn new(api: Arc<dyn MarksApi>, notifier: Arc<dyn Notifier>, limits: UploadLimits) -> Self {
        Self { api, notifier, limits }
    }

    /// Run the full workflow. Batch-level failures are reported once through
    /// the notifier and returned; row-level problems are in the report.
    #[instrument(skip(self, source), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self, kind: UploadKind, source: &dyn UploadSource) -> Result<UploadReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        counter!("mark_uploader_runs_total", "kind" => kind.as_str()).increment(1);

        match self.run_inner(run_id, kind, source).await {
            Ok(report) => {
                for notification in notifications_for(kind, &report.outcomes) {
                    self.notifier.notify(notification);
                }
                Ok(report)
            }
            Err(e) => {
                error!("Upload {} failed: {}", run_id, e);
                counter!("mark_uploader_failed_runs_total", "kind" => kind.as_str()).increment(1);
                self.notifier.notify(Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_inner(&self, run_id: Uuid, kind: UploadKind, source: &dyn UploadSource) -> Result<UploadReport> {
        let started_at = Utc::now();
        let t_run = std::time::Instant::now();

        // Step 1: preflight and parse
        let (file, rows) = read_upload(source, &self.limits)?.ok_or(UploadError::NoFile)?;
        let checksum = file.sha256_hex();
        info!("📄 Uploading {} as {} (sha256 {})", file.name, kind, checksum);

        // Step 2: header casing
        let rows = normalize_keys(rows);

        // Step 3: all-or-nothing validation
        let batch = validate_rows(kind, &rows)?;
        info!("✅ Validated {} rows", batch.len());

        // Step 4: reconcile row by row
        let reconciler = Reconciler::new(self.api.clone());
        let outcomes = match &batch {
            ValidatedBatch::Marks(rows) => reconciler.reconcile_marks(rows).await?,
            ValidatedBatch::PersonalCircumstances(rows) => {
                reconciler.reconcile_personal_circumstances(rows).await?
            }
            ValidatedBatch::AcademicMisconducts(rows) => {
                reconciler.reconcile_academic_misconducts(rows).await?
            }
        };

        let report = UploadReport::new(run_id, kind, file.name, checksum, started_at, outcomes);
        histogram!("mark_uploader_run_duration_seconds", "kind" => kind.as_str())
            .record(t_run.elapsed().as_secs_f64());
        info!(
            "Upload finished: {} created ({} new students), {} already uploaded, {} skipped, {} failed",
            report.created, report.students_created, report.already_exists, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Preflight, parse and validate without touching the API
    pub fn validate_only(&self, kind: UploadKind, source: &dyn UploadSource) -> Result<usize> {
        validate_upload(kind, source, &self.limits, self.notifier.as_ref())
    }
}

/// Preflight, parse and validate a file without any API access. Returns the
/// number of rows that would be uploaded.
#[instrument(skip(source, limits, notifier))]
pub fn validate_upload(
    kind: UploadKind,
    source: &dyn UploadSource,
    limits: &UploadLimits,
    notifier: &dyn Notifier,
) -> Result<usize> {
    let result = read_upload(source, limits)
        .and_then(|opened| opened.ok_or(UploadError::NoFile))
        .and_then(|(_, rows)| Ok(validate_rows(kind, &normalize_keys(rows))?.len()));
    match result {
        Ok(count) => {
            notifier.notify(Notification::success(format!(
                "{} rows are valid and ready to upload",
                count
            )));
            Ok(count)
        }
        Err(e) => {
            notifier.notify(Notification::error(e.to_string()));
            Err(e)
        }
    }
}
