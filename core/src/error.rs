use crate::case::CaseStatus;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} case '{case_id}' while it is {from}")]
    InvalidTransition {
        case_id: String,
        from: CaseStatus,
        action: String,
    },

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Storage failure: {0}")]
    StorageFailure(rusqlite::Error),

    #[error("Case store is closed")]
    StoreClosed,

    #[error("Corrupt {what} in store: '{value}'")]
    Corrupt { what: &'static str, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeskError {
    pub fn case_not_found(case_id: &str) -> Self {
        Self::NotFound {
            entity: "Case",
            id: case_id.to_string(),
        }
    }

    pub fn customer_not_found(customer_id: &str) -> Self {
        Self::NotFound {
            entity: "Customer",
            id: customer_id.to_string(),
        }
    }

    /// Transient failures may be retried. Mutating operations should only be
    /// retried after re-reading the case status.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_) | Self::StorageFailure(_))
    }

    /// HTTP-style status used by the request boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidTransition { .. } => 400,
            Self::ResourceExhausted(_) => 503,
            _ => 500,
        }
    }
}

impl From<rusqlite::Error> for DeskError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::ResourceExhausted(err.to_string())
            }
            _ => Self::StorageFailure(err),
        }
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
