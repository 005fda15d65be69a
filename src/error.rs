use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        ApplyError, InvalidTransition,
        feed::FeedError,
        ledger::SubmitError,
        session::{ControlError, JoinError},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No active session uses this join code.
    #[error("unknown session `{0}`")]
    UnknownSession(String),
    /// The player identity is not part of the session roster.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),
    /// Missing or invalid credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Host command does not match the current phase. State is unchanged.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Request conflicts with existing data (nickname, join code, archive entry).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Answer submission was refused.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl ServiceError {
    /// Stable machine-readable code used in socket error frames.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UnknownSession(_) => "unknown_session",
            ServiceError::UnknownPlayer(_) => "unknown_player",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Submit(err) => err.code(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyArchived(code) => {
                ServiceError::Conflict(format!("results for `{code}` are already archived"))
            }
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidTransition(err.to_string())
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        ServiceError::InvalidTransition(format!("state changed during transition: {err}"))
    }
}

impl From<ControlError> for ServiceError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::InvalidTransition(invalid) => invalid.into(),
            ControlError::Apply(apply) => apply.into(),
            invalid @ ControlError::InvalidQuestionCount { .. } => {
                ServiceError::InvalidInput(invalid.to_string())
            }
        }
    }
}

impl From<JoinError> for ServiceError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::RosterFrozen => ServiceError::InvalidTransition(err.to_string()),
            JoinError::NicknameTaken(_) => ServiceError::Conflict(err.to_string()),
            JoinError::InvalidNickname => ServiceError::InvalidInput(err.to_string()),
        }
    }
}

impl From<FeedError> for ServiceError {
    fn from(err: FeedError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownSession(_) | ServiceError::UnknownPlayer(_) => {
                AppError::NotFound(err.to_string())
            }
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidTransition(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::Submit(submit) => AppError::Conflict(submit.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            ok: false,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{SessionEvent, SessionPhase};

    #[test]
    fn invalid_transition_maps_to_conflict() {
        let err: ServiceError = InvalidTransition {
            from: SessionPhase::Lobby,
            event: SessionEvent::EndQuestion,
        }
        .into();
        assert_eq!(err.code(), "invalid_transition");

        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn submit_errors_keep_their_wire_code() {
        let err = ServiceError::from(SubmitError::DuplicateAnswer);
        assert_eq!(err.code(), "duplicate_answer");
    }

    #[test]
    fn unknown_session_is_not_found() {
        let response = AppError::from(ServiceError::UnknownSession("NOPE".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
