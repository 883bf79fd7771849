use super::{required, whole_number, RowValidator};
use crate::constants::{
    CLASS_CODE, DEGREE_LEVEL, DEGREE_NAME, MARK, MARK_CODE, MARK_MIN_FIELDS, MAX_MARK, REG_NO,
    STUDENT_NAME,
};
use crate::error::ValidationFailure;
use crate::types::{MarkCode, MarkRow, RawRow};
use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{3}$").expect("class code pattern is valid"));

pub fn is_valid_class_code(code: &str) -> bool {
    CLASS_CODE_RE.is_match(code)
}

const REQUIRED: [&str; 6] = [CLASS_CODE, REG_NO, MARK, STUDENT_NAME, DEGREE_LEVEL, DEGREE_NAME];

/// Student marks: one class per file, marks in 0..=100
pub struct MarkValidator;

impl RowValidator for MarkValidator {
    type Row = MarkRow;

    fn min_fields(&self) -> usize {
        MARK_MIN_FIELDS
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &REQUIRED
    }

    fn check_against_first(&self, row: &RawRow, first: &RawRow) -> Result<(), ValidationFailure> {
        let expected = first.get(CLASS_CODE).unwrap_or("").trim();
        match row.get(CLASS_CODE).map(str::trim) {
            Some(found) if !found.is_empty() && found != expected => {
                Err(ValidationFailure::ClassCodeMismatch {
                    expected: expected.to_string(),
                    found: found.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn convert(&self, row: &RawRow, line: usize) -> Result<MarkRow, ValidationFailure> {
        let class_code = required(row, CLASS_CODE)?;
        if !is_valid_class_code(class_code) {
            return Err(ValidationFailure::InvalidClassCode(class_code.to_string()));
        }

        let mark_text = required(row, MARK)?;
        let mark = match whole_number::<u8>(mark_text) {
            Some(m) if m <= MAX_MARK => m,
            _ => return Err(ValidationFailure::InvalidMark(mark_text.to_string())),
        };

        let mark_code = match row.get(MARK_CODE).map(str::trim) {
            Some(code) if !code.is_empty() => Some(
                code.parse::<MarkCode>()
                    .map_err(|_| ValidationFailure::InvalidMarkCode(code.to_string()))?,
            ),
            _ => None,
        };

        Ok(MarkRow {
            line,
            class_code: class_code.to_string(),
            reg_no: required(row, REG_NO)?.to_string(),
            mark,
            student_name: required(row, STUDENT_NAME)?.to_string(),
            degree_level: required(row, DEGREE_LEVEL)?.to_string(),
            degree_name: required(row, DEGREE_NAME)?.to_string(),
            mark_code,
        })
    }
}
