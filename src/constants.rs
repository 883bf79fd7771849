/// Upload kind constants to keep the CLI, config and pipeline in agreement.
/// These are the user-facing names selected when starting an upload.
pub const STUDENT_MARKS: &str = "student_marks";
pub const PERSONAL_CIRCUMSTANCES: &str = "personal_circumstances";
pub const ACADEMIC_MISCONDUCTS: &str = "academic_misconducts";

// Upload limits
pub const MAX_UPLOAD_BYTES: u64 = 5_242_880;
pub const CSV_MIME_TYPE: &str = "text/csv";
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

// Minimum number of columns a row must carry, per upload kind
pub const MARK_MIN_FIELDS: usize = 6;
pub const PERSONAL_CIRCUMSTANCE_MIN_FIELDS: usize = 5;
pub const ACADEMIC_MISCONDUCT_MIN_FIELDS: usize = 5;

// Column names, compared after lowercasing the header
pub const CLASS_CODE: &str = "class_code";
pub const REG_NO: &str = "reg_no";
pub const MARK: &str = "mark";
pub const STUDENT_NAME: &str = "student_name";
pub const DEGREE_LEVEL: &str = "degree_level";
pub const DEGREE_NAME: &str = "degree_name";
pub const MARK_CODE: &str = "mark_code";
pub const DETAILS: &str = "details";
pub const SEMESTER: &str = "semester";
pub const CATEGORY: &str = "cat";
pub const COMMENTS: &str = "comments";
pub const DATE: &str = "date";
pub const MODULE_CODE: &str = "module_code";
pub const MODULE_NAME: &str = "module_name";
pub const OUTCOME: &str = "outcome";

pub const MARK_CODES: [&str; 5] = ["FO", "UM", "PM", "EN", "EX"];
pub const MISCONDUCT_OUTCOMES: [&str; 2] = ["upheld", "under investigation"];
pub const MAX_CATEGORY: u8 = 3;
pub const MAX_MARK: u8 = 100;

// Environment variables
pub const API_URL_ENV: &str = "MARK_API_URL";
pub const API_TOKEN_ENV: &str = "MARK_API_TOKEN";
pub const CONFIG_PATH_ENV: &str = "MARK_UPLOADER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Get all supported upload kind names
pub fn get_supported_kinds() -> Vec<&'static str> {
    vec![STUDENT_MARKS, PERSONAL_CIRCUMSTANCES, ACADEMIC_MISCONDUCTS]
}
