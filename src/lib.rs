//! Upload client for the university mark-management API: parses CSV files of
//! marks, personal circumstances or academic misconducts, validates them as a
//! batch and reconciles each row against the API.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod reporting;
pub mod types;
pub mod validation;

// Ports and their adapters
pub mod app;
pub mod infra;

pub use error::{ApiError, Result, UploadError, ValidationError, ValidationFailure};
pub use pipeline::UploadPipeline;
pub use types::UploadKind;
