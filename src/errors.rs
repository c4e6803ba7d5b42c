use sea_orm::error::DbErr;
use serde::Serialize;
use strum::Display;

/// Coarse classification callers can branch on without matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Forbidden,
    PreconditionFailed,
    InvalidState,
    Conflict,
    NotFound,
    Validation,
    Configuration,
    Internal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Actor lacks the role/assignment the operation requires.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Record is in the right state but a required field is missing.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Single source of truth for error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::InvalidStatus(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) | Self::DatabaseError(DbErr::RecordNotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::MissingConfiguration(_) => ErrorKind::Configuration,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Message without the variant prefix, suitable for showing to the acting user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::Forbidden(msg)
            | Self::PreconditionFailed(msg)
            | Self::InvalidStatus(msg)
            | Self::Conflict(msg)
            | Self::MissingConfiguration(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
