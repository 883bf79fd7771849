use super::{required, whole_number, RowValidator};
use crate::constants::{
    CATEGORY, COMMENTS, DETAILS, MAX_CATEGORY, PERSONAL_CIRCUMSTANCE_MIN_FIELDS, REG_NO, SEMESTER,
};
use crate::error::ValidationFailure;
use crate::types::{PersonalCircumstanceRow, RawRow};

// comments must be a column but may be left blank
const REQUIRED: [&str; 4] = [REG_NO, DETAILS, SEMESTER, CATEGORY];

pub struct PersonalCircumstanceValidator;

impl RowValidator for PersonalCircumstanceValidator {
    type Row = PersonalCircumstanceRow;

    fn min_fields(&self) -> usize {
        PERSONAL_CIRCUMSTANCE_MIN_FIELDS
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &REQUIRED
    }

    fn convert(&self, row: &RawRow, line: usize) -> Result<PersonalCircumstanceRow, ValidationFailure> {
        let cat_text = required(row, CATEGORY)?;
        let category = match whole_number::<u8>(cat_text) {
            Some(c) if c <= MAX_CATEGORY => c,
            _ => return Err(ValidationFailure::InvalidCategory(cat_text.to_string())),
        };
        let comments = row
            .get(COMMENTS)
            .ok_or(ValidationFailure::MissingField(COMMENTS))?;

        Ok(PersonalCircumstanceRow {
            line,
            reg_no: required(row, REG_NO)?.to_string(),
            details: required(row, DETAILS)?.to_string(),
            semester: required(row, SEMESTER)?.to_string(),
            category,
            comments: comments.trim().to_string(),
        })
    }
}
