use crate::error::ApiError;
use crate::types::{
    AcademicMisconduct, Class, Degree, EntityId, Mark, NewAcademicMisconduct, NewMark,
    NewPersonalCircumstance, NewStudent, PersonalCircumstance, Student,
};
use async_trait::async_trait;
use serde::Serialize;

/// Contract of the marks API consumed by the upload workflow.
/// Lookups return `Ok(None)` when the API reports the entity as not found.
#[async_trait]
pub trait MarksApi: Send + Sync {
    /// Whether a bearer credential is available; without one no call is made
    fn has_credential(&self) -> bool;

    async fn get_class_by_code(&self, code: &str) -> Result<Option<Class>, ApiError>;

    async fn get_student_by_reg_no(&self, reg_no: &str) -> Result<Option<Student>, ApiError>;
    async fn create_student(&self, student: &NewStudent) -> Result<Student, ApiError>;

    async fn get_degree_by_name(&self, name: &str) -> Result<Option<Degree>, ApiError>;

    async fn get_mark(&self, student_id: EntityId, class_id: EntityId) -> Result<Option<Mark>, ApiError>;
    async fn create_mark(&self, mark: &NewMark) -> Result<Mark, ApiError>;

    async fn create_personal_circumstance(
        &self,
        record: &NewPersonalCircumstance,
    ) -> Result<PersonalCircumstance, ApiError>;

    async fn create_academic_misconduct(
        &self,
        record: &NewAcademicMisconduct,
    ) -> Result<AcademicMisconduct, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// One user-visible message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Error, message: message.into() }
    }
}

/// Presents notifications to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
