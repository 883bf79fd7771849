//! All-or-nothing validation of a normalized batch.
//!
//! Every row goes through the same ordered checks: minimum field count, the
//! batch-wide invariant (marks only), presence of required values, then the
//! kind-specific semantic checks. The first failing check anywhere rejects
//! the whole batch.

pub mod academic_misconduct;
pub mod marks;
pub mod personal_circumstances;

pub use academic_misconduct::AcademicMisconductValidator;
pub use marks::{is_valid_class_code, MarkValidator};
pub use personal_circumstances::PersonalCircumstanceValidator;

use crate::error::{ValidationError, ValidationFailure};
use crate::types::{AcademicMisconductRow, MarkRow, PersonalCircumstanceRow, RawRow, UploadKind};
use tracing::{debug, warn};

/// Rules for one upload kind
pub trait RowValidator {
    type Row;

    fn min_fields(&self) -> usize;

    /// Columns that must be present with a non-blank value
    fn required_fields(&self) -> &'static [&'static str];

    /// Invariant every row must share with the first row of the batch
    fn check_against_first(&self, _row: &RawRow, _first: &RawRow) -> Result<(), ValidationFailure> {
        Ok(())
    }

    /// Semantic checks, producing the typed row for file line `line`
    fn convert(&self, row: &RawRow, line: usize) -> Result<Self::Row, ValidationFailure>;
}

/// Validate every row in order, stopping at the first violation. Reported row
/// numbers are file line numbers: the line the parser recorded, or
/// `index + 2` (after the header line) for rows built without one.
pub fn validate_batch<V: RowValidator>(
    validator: &V,
    rows: &[RawRow],
) -> Result<Vec<V::Row>, ValidationError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let line = row.line().unwrap_or(index + 2);
        let checked = check_row(validator, row, first, line).map_err(|failure| ValidationError {
            row: line,
            failure,
        });
        match checked {
            Ok(typed) => out.push(typed),
            Err(e) => {
                warn!("Batch rejected: {}", e);
                return Err(e);
            }
        }
    }
    debug!("Validated {} rows", out.len());
    Ok(out)
}

fn check_row<V: RowValidator>(
    validator: &V,
    row: &RawRow,
    first: &RawRow,
    line: usize,
) -> Result<V::Row, ValidationFailure> {
    if row.len() < validator.min_fields() {
        return Err(ValidationFailure::TooFewFields {
            expected: validator.min_fields(),
            found: row.len(),
        });
    }
    validator.check_against_first(row, first)?;
    for field in validator.required_fields() {
        required(row, *field)?;
    }
    validator.convert(row, line)
}

/// Value of a column that must be present and non-blank
pub(crate) fn required<'a>(row: &'a RawRow, field: &'static str) -> Result<&'a str, ValidationFailure> {
    match row.get(field) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim()),
        _ => Err(ValidationFailure::MissingField(field)),
    }
}

/// Parse a whole number written as plain ASCII digits. Signs, spaces and
/// decimals are rejected.
pub(crate) fn whole_number<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Typed rows of a batch that passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedBatch {
    Marks(Vec<MarkRow>),
    PersonalCircumstances(Vec<PersonalCircumstanceRow>),
    AcademicMisconducts(Vec<AcademicMisconductRow>),
}

impl ValidatedBatch {
    pub fn len(&self) -> usize {
        match self {
            ValidatedBatch::Marks(rows) => rows.len(),
            ValidatedBatch::PersonalCircumstances(rows) => rows.len(),
            ValidatedBatch::AcademicMisconducts(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the validator matching `kind` over normalized rows
pub fn validate_rows(kind: UploadKind, rows: &[RawRow]) -> Result<ValidatedBatch, ValidationError> {
    Ok(match kind {
        UploadKind::StudentMarks => ValidatedBatch::Marks(validate_batch(&MarkValidator, rows)?),
        UploadKind::PersonalCircumstances => ValidatedBatch::PersonalCircumstances(validate_batch(
            &PersonalCircumstanceValidator,
            rows,
        )?),
        UploadKind::AcademicMisconducts => ValidatedBatch::AcademicMisconducts(validate_batch(
            &AcademicMisconductValidator,
            rows,
        )?),
    })
}


#[cfg(test)]
mod tests {
    use super::test_rows::mark;
    use super::*;

    #[test]
    fn empty_batch_validates_to_nothing() {
        assert!(validate_batch(&MarkValidator, &[]).unwrap().is_empty());
    }

    #[test]
    fn row_number_accounts_for_header_line() {
        let rows = vec![mark("CS408", "B1", "50"), mark("CS408", "B2", "50"), mark("CS408", "B3", "x")];
        let err = validate_batch(&MarkValidator, &rows).unwrap_err();
        assert_eq!(err.row, 4);
    }

    #[test]
    fn parser_line_wins_over_position() {
        let rows = vec![
            mark("CS408", "B1", "50").with_line(2),
            mark("CS408", "B2", "x").with_line(4),
        ];
        let err = validate_batch(&MarkValidator, &rows).unwrap_err();
        assert_eq!(err.row, 4);

        let typed = validate_batch(&MarkValidator, &rows[..1]).unwrap();
        assert_eq!(typed[0].line, 2);
    }

    #[test]
    fn whole_numbers_are_plain_digits() {
        assert_eq!(whole_number::<u8>("070"), Some(70));
        assert_eq!(whole_number::<u8>("+50"), None);
        assert_eq!(whole_number::<u8>("-0"), None);
        assert_eq!(whole_number::<u8>(""), None);
        assert_eq!(whole_number::<u8>("300"), None);
    }

    #[test]
    fn only_first_violation_is_reported() {
        let rows = vec![mark("CS408", "B1", "500"), mark("CS408", "", "-3")];
        let err = validate_batch(&MarkValidator, &rows).unwrap_err();
        assert_eq!(err.row, 2);
        assert_eq!(err.failure, ValidationFailure::InvalidMark("500".into()));
    }

    #[test]
    fn validate_rows_dispatches_on_kind() {
        let rows = vec![mark("CS408", "B1", "50")];
        let batch = validate_rows(UploadKind::StudentMarks, &rows).unwrap();
        assert_eq!(batch.len(), 1);

        let err = validate_rows(UploadKind::PersonalCircumstances, &rows).unwrap_err();
        assert_eq!(err.failure, ValidationFailure::MissingField("details"));
    }
}
