use crate::app::ports::MarksApi;
use crate::error::ApiError;
use crate::types::{
    AcademicMisconduct, Class, Degree, EntityId, Mark, NewAcademicMisconduct, NewMark,
    NewPersonalCircumstance, NewStudent, PersonalCircumstance, Student,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// A call made against the in-memory API, in the order received
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiCall {
    GetClass(String),
    GetStudent(String),
    CreateStudent(String),
    GetDegree(String),
    GetMark(EntityId, EntityId),
    CreateMark(EntityId, EntityId),
    CreatePersonalCircumstance(String),
    CreateAcademicMisconduct(String),
}

impl ApiCall {
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            ApiCall::CreateStudent(_)
                | ApiCall::CreateMark(..)
                | ApiCall::CreatePersonalCircumstance(_)
                | ApiCall::CreateAcademicMisconduct(_)
        )
    }
}

#[derive(Default)]
struct State {
    next_id: EntityId,
    classes: HashMap<String, Class>,
    students: HashMap<String, Student>,
    degrees: Vec<Degree>,
    marks: HashMap<(EntityId, EntityId), Mark>,
    personal_circumstances: Vec<PersonalCircumstance>,
    academic_misconducts: Vec<AcademicMisconduct>,
    failures: HashMap<ApiCall, ApiError>,
    calls: Vec<ApiCall>,
}

impl State {
    fn next_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    /// Log the call and return the failure injected for it, if any
    fn record(&mut self, call: ApiCall) -> Result<(), ApiError> {
        let failure = self.failures.get(&call).cloned();
        self.calls.push(call);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-process marks API for development and testing. Seed it with classes,
/// degrees, students and marks, then inspect the calls and created records.
pub struct InMemoryMarksApi {
    credential: bool,
    state: Mutex<State>,
}

impl Default for InMemoryMarksApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarksApi {
    pub fn new() -> Self {
        Self {
            credential: true,
            state: Mutex::new(State::default()),
        }
    }

    pub fn without_credential() -> Self {
        Self {
            credential: false,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_class(&self, code: &str) -> EntityId {
        let mut state = self.state();
        let id = state.next_id();
        state.classes.insert(
            code.to_string(),
            Class { id, code: code.to_string(), name: None },
        );
        id
    }

    pub fn add_degree(&self, name: &str) -> EntityId {
        let mut state = self.state();
        let id = state.next_id();
        state.degrees.push(Degree { id, name: name.to_string(), level: None });
        id
    }

    pub fn add_student(&self, reg_no: &str, name: &str, degree_id: Option<EntityId>) -> EntityId {
        let mut state = self.state();
        let id = state.next_id();
        state.students.insert(
            reg_no.to_string(),
            Student { id, reg_no: reg_no.to_string(), name: Some(name.to_string()), degree_id },
        );
        id
    }

    pub fn add_mark(&self, student_id: EntityId, class_id: EntityId, mark: u8) -> EntityId {
        let mut state = self.state();
        let id = state.next_id();
        state.marks.insert(
            (student_id, class_id),
            Mark { id, mark, student_id, class_id, mark_code: None },
        );
        id
    }

    /// Make every future `call` fail with `err`
    pub fn fail_call(&self, call: ApiCall, err: ApiError) {
        self.state().failures.insert(call, err);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn create_calls(&self) -> Vec<ApiCall> {
        self.state().calls.iter().filter(|c| c.is_create()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn student(&self, reg_no: &str) -> Option<Student> {
        self.state().students.get(reg_no).cloned()
    }

    pub fn marks(&self) -> Vec<Mark> {
        let mut marks: Vec<Mark> = self.state().marks.values().cloned().collect();
        marks.sort_by_key(|m| m.id);
        marks
    }

    pub fn personal_circumstances(&self) -> Vec<PersonalCircumstance> {
        self.state().personal_circumstances.clone()
    }

    pub fn academic_misconducts(&self) -> Vec<AcademicMisconduct> {
        self.state().academic_misconducts.clone()
    }
}

#[async_trait]
impl MarksApi for InMemoryMarksApi {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn get_class_by_code(&self, code: &str) -> Result<Option<Class>, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::GetClass(code.to_string()))?;
        Ok(state.classes.get(code).cloned())
    }

    async fn get_student_by_reg_no(&self, reg_no: &str) -> Result<Option<Student>, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::GetStudent(reg_no.to_string()))?;
        Ok(state.students.get(reg_no).cloned())
    }

    async fn create_student(&self, student: &NewStudent) -> Result<Student, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::CreateStudent(student.reg_no.clone()))?;
        if state.students.contains_key(&student.reg_no) {
            return Err(ApiError::Status {
                status: 409,
                message: format!("student {} already exists", student.reg_no),
            });
        }
        let id = state.next_id();
        let created = Student {
            id,
            reg_no: student.reg_no.clone(),
            name: Some(student.name.clone()),
            degree_id: Some(student.degree_id),
        };
        state.students.insert(student.reg_no.clone(), created.clone());
        debug!("Created student: {} with id {}", student.reg_no, id);
        Ok(created)
    }

    async fn get_degree_by_name(&self, name: &str) -> Result<Option<Degree>, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::GetDegree(name.to_string()))?;
        Ok(state
            .degrees
            .iter()
            .find(|d| d.name.to_lowercase() == name.to_lowercase())
            .cloned())
    }

    async fn get_mark(&self, student_id: EntityId, class_id: EntityId) -> Result<Option<Mark>, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::GetMark(student_id, class_id))?;
        Ok(state.marks.get(&(student_id, class_id)).cloned())
    }

    async fn create_mark(&self, mark: &NewMark) -> Result<Mark, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::CreateMark(mark.student_id, mark.class_id))?;
        let id = state.next_id();
        let created = Mark {
            id,
            mark: mark.mark,
            student_id: mark.student_id,
            class_id: mark.class_id,
            mark_code: mark.mark_code,
        };
        state.marks.insert((mark.student_id, mark.class_id), created.clone());
        debug!("Created mark {} for student {} in class {}", id, mark.student_id, mark.class_id);
        Ok(created)
    }

    async fn create_personal_circumstance(
        &self,
        record: &NewPersonalCircumstance,
    ) -> Result<PersonalCircumstance, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::CreatePersonalCircumstance(record.reg_no.clone()))?;
        let id = state.next_id();
        let created = PersonalCircumstance {
            id,
            reg_no: record.reg_no.clone(),
            details: Some(record.details.clone()),
            semester: Some(record.semester.clone()),
            cat: Some(record.cat),
            comments: Some(record.comments.clone()),
        };
        state.personal_circumstances.push(created.clone());
        Ok(created)
    }

    async fn create_academic_misconduct(
        &self,
        record: &NewAcademicMisconduct,
    ) -> Result<AcademicMisconduct, ApiError> {
        let mut state = self.state();
        state.record(ApiCall::CreateAcademicMisconduct(record.reg_no.clone()))?;
        let id = state.next_id();
        let created = AcademicMisconduct {
            id,
            reg_no: record.reg_no.clone(),
            date: Some(record.date.clone()),
            class_code: Some(record.class_code.clone()),
            outcome: Some(record.outcome.clone()),
        };
        state.academic_misconducts.push(created.clone());
        Ok(created)
    }
}
