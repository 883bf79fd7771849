use super::{required, whole_number, RowValidator};
use crate::constants::{
    ACADEMIC_MISCONDUCT_MIN_FIELDS, DATE, MISCONDUCT_OUTCOMES, MODULE_CODE, MODULE_NAME, OUTCOME,
    REG_NO,
};
use crate::error::ValidationFailure;
use crate::types::{AcademicMisconductRow, RawRow};

const REQUIRED: [&str; 5] = [DATE, REG_NO, MODULE_CODE, MODULE_NAME, OUTCOME];

// No shared-module check across rows, unlike the class check for marks.
pub struct AcademicMisconductValidator;

impl RowValidator for AcademicMisconductValidator {
    type Row = AcademicMisconductRow;

    fn min_fields(&self) -> usize {
        ACADEMIC_MISCONDUCT_MIN_FIELDS
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &REQUIRED
    }

    fn convert(&self, row: &RawRow, line: usize) -> Result<AcademicMisconductRow, ValidationFailure> {
        let module_code = required(row, MODULE_CODE)?;
        if whole_number::<u64>(module_code).is_none() {
            return Err(ValidationFailure::InvalidModuleCode(module_code.to_string()));
        }

        let outcome = required(row, OUTCOME)?;
        let lowered = outcome.to_lowercase();
        if !MISCONDUCT_OUTCOMES.contains(&lowered.as_str()) {
            return Err(ValidationFailure::InvalidOutcome(outcome.to_string()));
        }

        Ok(AcademicMisconductRow {
            line,
            date: required(row, DATE)?.to_string(),
            reg_no: required(row, REG_NO)?.to_string(),
            module_code: module_code.to_string(),
            module_name: required(row, MODULE_NAME)?.to_string(),
            outcome: outcome.to_string(),
        })
    }
}
