use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Unsupported file type '{0}', expected a CSV file")]
    UnsupportedMimeType(String),

    #[error("No file was provided")]
    NoFile,

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("The uploaded file contains no data rows")]
    EmptyBatch,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Class {0} does not exist")]
    ClassNotFound(String),

    #[error("Could not look up class {code}: {source}")]
    ClassLookup {
        code: String,
        #[source]
        source: ApiError,
    },

    #[error("No API credential available, set MARK_API_TOKEN or pass --token")]
    MissingCredential,

    #[error("Unknown upload kind: {0}")]
    UnknownKind(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a single call against the marks API. A 404 is not an error:
/// lookups report it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("request was not authorized")]
    Unauthorized,

    #[error("API responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("could not decode API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// First violation found while validating a batch. `row` is the line number
/// in the uploaded file (header is line 1).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Row {row}: {failure}")]
pub struct ValidationError {
    pub row: usize,
    pub failure: ValidationFailure,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("class code {found} differs from {expected}, a file may only contain marks for one class")]
    ClassCodeMismatch { expected: String, found: String },

    #[error("missing value for '{0}'")]
    MissingField(&'static str),

    #[error("class code '{0}' must be two capital letters followed by three digits")]
    InvalidClassCode(String),

    #[error("mark '{0}' must be a whole number between 0 and 100")]
    InvalidMark(String),

    #[error("mark code '{0}' must be one of FO, UM, PM, EN, EX")]
    InvalidMarkCode(String),

    #[error("category '{0}' must be 0, 1, 2 or 3")]
    InvalidCategory(String),

    #[error("outcome '{0}' must be 'upheld' or 'under investigation'")]
    InvalidOutcome(String),

    #[error("module code '{0}' must be a number")]
    InvalidModuleCode(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_row_and_constraint() {
        let err = ValidationError {
            row: 4,
            failure: ValidationFailure::InvalidMark("101".into()),
        };
        assert_eq!(
            err.to_string(),
            "Row 4: mark '101' must be a whole number between 0 and 100"
        );
    }

    #[test]
    fn validation_error_converts_into_upload_error() {
        let err: UploadError = ValidationError {
            row: 2,
            failure: ValidationFailure::MissingField("reg_no"),
        }
        .into();
        assert!(matches!(err, UploadError::Validation(ref v) if v.row == 2));
        assert_eq!(err.to_string(), "Row 2: missing value for 'reg_no'");
    }
}
