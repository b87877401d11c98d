use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LoanId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("unsupported status value: {value}")]
    InvalidStatus {
        value: String,
    },

    #[error("contract already exists for loan {loan_id}")]
    DuplicateContract {
        loan_id: LoanId,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("numeric domain error: {message}")]
    NumericDomain {
        message: String,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

/// coarse error classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    ValidationFailure,
    StorageFailure,
}

impl LendingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LendingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(current: impl ToString, expected: impl ToString) -> Self {
        LendingError::InvalidState {
            current: current.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LendingError::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LendingError::Storage {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LendingError::NotFound { .. } => ErrorKind::NotFound,
            LendingError::InvalidState { .. }
            | LendingError::InvalidStatus { .. }
            | LendingError::DuplicateContract { .. } => ErrorKind::InvalidState,
            LendingError::Validation { .. } | LendingError::NumericDomain { .. } => {
                ErrorKind::ValidationFailure
            }
            LendingError::Storage { .. } => ErrorKind::StorageFailure,
        }
    }

    /// storage failures are never shown to the caller verbatim
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::StorageFailure
    }

    /// message safe to hand back to the caller
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal failure".to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
