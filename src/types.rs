use crate::constants::{ACADEMIC_MISCONDUCTS, PERSONAL_CIRCUMSTANCES, STUDENT_MARKS};
use crate::error::UploadError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier the marks API assigns to its entities
pub type EntityId = i64;

/// One parsed CSV record: column name to cell value, in header order.
/// Short rows simply carry fewer fields. `line` is the record's line in the
/// source file when it came from one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    line: Option<usize>,
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Look up a cell by exact column name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Same row with every column name lowercased
    pub fn with_lowercase_keys(self) -> Self {
        Self {
            line: self.line,
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            line: None,
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Which record kind an uploaded file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    StudentMarks,
    PersonalCircumstances,
    AcademicMisconducts,
}

impl UploadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::StudentMarks => STUDENT_MARKS,
            UploadKind::PersonalCircumstances => PERSONAL_CIRCUMSTANCES,
            UploadKind::AcademicMisconducts => ACADEMIC_MISCONDUCTS,
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadKind {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            STUDENT_MARKS => Ok(UploadKind::StudentMarks),
            PERSONAL_CIRCUMSTANCES => Ok(UploadKind::PersonalCircumstances),
            ACADEMIC_MISCONDUCTS => Ok(UploadKind::AcademicMisconducts),
            other => Err(UploadError::UnknownKind(other.to_string())),
        }
    }
}

/// Override status recorded alongside a numeric mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkCode {
    FO,
    UM,
    PM,
    EN,
    EX,
}

impl FromStr for MarkCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FO" => Ok(MarkCode::FO),
            "UM" => Ok(MarkCode::UM),
            "PM" => Ok(MarkCode::PM),
            "EN" => Ok(MarkCode::EN),
            "EX" => Ok(MarkCode::EX),
            _ => Err(()),
        }
    }
}

/// A validated row of a student marks upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkRow {
    /// Line in the uploaded file
    pub line: usize,
    pub class_code: String,
    pub reg_no: String,
    pub mark: u8,
    pub student_name: String,
    pub degree_level: String,
    pub degree_name: String,
    pub mark_code: Option<MarkCode>,
}

/// A validated row of a personal circumstances upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalCircumstanceRow {
    pub line: usize,
    pub reg_no: String,
    pub details: String,
    pub semester: String,
    pub category: u8,
    pub comments: String,
}

/// A validated row of an academic misconduct upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicMisconductRow {
    pub line: usize,
    pub date: String,
    pub reg_no: String,
    /// Digits as written, leading zeros kept
    pub module_code: String,
    pub module_name: String,
    pub outcome: String,
}

// Entities owned by the marks API

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: EntityId,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: EntityId,
    pub reg_no: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub degree_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degree {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: EntityId,
    pub mark: u8,
    pub student_id: EntityId,
    pub class_id: EntityId,
    #[serde(default)]
    pub mark_code: Option<MarkCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalCircumstance {
    pub id: EntityId,
    pub reg_no: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub cat: Option<u8>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicMisconduct {
    pub id: EntityId,
    pub reg_no: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub class_code: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

// Create payloads

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStudent {
    pub reg_no: String,
    pub name: String,
    pub degree_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMark {
    pub mark: u8,
    pub student_id: EntityId,
    pub class_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_code: Option<MarkCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPersonalCircumstance {
    pub reg_no: String,
    pub details: String,
    pub semester: String,
    pub cat: u8,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAcademicMisconduct {
    pub date: String,
    pub class_code: String,
    pub reg_no: String,
    pub outcome: String,
}
