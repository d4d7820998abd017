use serde::Serialize;
use thiserror::Error;

/// Wire shape the embedding server serializes errors into.
#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{1}")]
    InvalidArgument(&'static str, String),
    #[error("{1}")]
    NotFound(&'static str, String),
    #[error("{1}")]
    Conflict(&'static str, String),
    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn doctor_double_booked() -> Self {
        ServiceError::Conflict(
            "DOCTOR_ALREADY_BOOKED",
            "Doctor is already booked for this time slot".into(),
        )
    }

    pub fn appointment_not_found(id: i64) -> Self {
        ServiceError::NotFound("APPOINTMENT_NOT_FOUND", format!("appointment not found: {id}"))
    }

    pub fn code(&self) -> &str {
        match self {
            ServiceError::InvalidArgument(code, _) => code,
            ServiceError::NotFound(code, _) => code,
            ServiceError::Conflict(code, _) => code,
            ServiceError::Unexpected(_) => "INTERNAL",
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}
