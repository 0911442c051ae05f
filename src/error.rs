//! Stable error codes for the CLI and any JSON consumer.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Credentials rejected or database unreachable.
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid flow transition: {0}")]
    InvalidTransition(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("{0}")]
    Io(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::Export(_) => "EXPORT_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    pub fn to_serde(&self) -> AppErrorDto {
        AppErrorDto {
            code: self.code().to_string(),
            message: self.to_string(),
            details: None,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Query(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Export(e.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_serde().serialize(serializer)
    }
}

#[derive(Debug, Serialize)]
pub struct AppErrorDto {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// Process exit code and optional stderr line for a top-level failure.
///
/// A connection failure exits with 2 and prints nothing (the caller logs it);
/// any other error exits with 1 and prints its JSON DTO.
pub fn exit_status(err: &AppError) -> (i32, Option<String>) {
    match err {
        AppError::Connection(_) => (2, None),
        e => {
            let dto = serde_json::to_string(&e.to_serde()).unwrap_or_else(|_| e.to_string());
            (1, Some(dto))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failure_exits_quietly_with_2() {
        let err = AppError::Connection("password authentication failed".into());
        assert_eq!(exit_status(&err), (2, None));
    }

    #[test]
    fn missing_credential_prints_dto_and_exits_1() {
        let (code, line) = exit_status(&AppError::MissingCredential("postgres.path".into()));
        assert_eq!(code, 1);
        let dto: serde_json::Value = serde_json::from_str(&line.unwrap()).unwrap();
        assert_eq!(dto["code"], "MISSING_CREDENTIAL");
        assert_eq!(dto["message"], "Missing credential: postgres.path");
    }

    #[test]
    fn query_failure_prints_dto_and_exits_1() {
        let (code, line) = exit_status(&AppError::Query("no such table: listings".into()));
        assert_eq!(code, 1);
        let dto: serde_json::Value = serde_json::from_str(&line.unwrap()).unwrap();
        assert_eq!(dto["code"], "QUERY_ERROR");
        assert!(dto["details"].is_null());
    }
}
