use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::camp::CampError;
use crate::workflows::import::ScoreImportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Camp(CampError),
    Import(ScoreImportError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Camp(err) => err.status_code(),
            AppError::Import(ScoreImportError::Csv(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Import(ScoreImportError::Io(_))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Camp(err) => write!(f, "{}", err),
            AppError::Import(err) => write!(f, "score import error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Camp(err) => Some(err),
            AppError::Import(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CampError> for AppError {
    fn from(value: CampError) -> Self {
        Self::Camp(value)
    }
}

impl From<ScoreImportError> for AppError {
    fn from(value: ScoreImportError) -> Self {
        Self::Import(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::closure::{ClosureError, StepKey};
    use crate::workflows::evaluation::{CampId, ValidationError};

    #[test]
    fn camp_errors_keep_their_status() {
        let archived = AppError::from(CampError::Archived(CampId::new("camp-1")));
        assert_eq!(archived.status_code(), StatusCode::CONFLICT);

        let archiving = AppError::from(CampError::Archiving(CampId::new("camp-1")));
        assert_eq!(archiving.status_code(), StatusCode::CONFLICT);
        assert_eq!(archiving.to_string(), "camp camp-1 is being archived");

        let not_ready = AppError::from(CampError::from(ClosureError::StepNotReady {
            step: StepKey::FinalArchive,
            waiting_on: vec![StepKey::ExportData],
        }));
        assert_eq!(not_ready.status_code(), StatusCode::CONFLICT);

        let invalid = AppError::from(CampError::from(ValidationError::OutOfRange {
            value: 6.0,
            min: 1.0,
            max: 5.0,
        }));
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = AppError::from(CampError::CampNotFound(CampId::new("nope")));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.to_string(), "io error: disk");
    }
}
