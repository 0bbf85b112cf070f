use thiserror::Error;

use crate::model::{EntityKind, RecordId};

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failure kinds surfaced by the store, query and backup layers.
///
/// Callers translate these into user-facing messages; the engine never
/// substitutes defaults for malformed data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("{kind} #{id} not found")]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("malformed {field} value {value:?}")]
    InvalidData { field: &'static str, value: String },

    #[error("conflict: {message}")]
    Conflict { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidData,
    Conflict,
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: RecordId) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn invalid_data(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidData {
            field,
            value: value.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidData { .. } => ErrorKind::InvalidData,
            Self::Conflict { .. } => ErrorKind::Conflict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_record() {
        let err = EngineError::not_found(EntityKind::Todo, 7);
        assert_eq!(err.to_string(), "todo #7 not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn invalid_data_quotes_the_offending_value() {
        let err = EngineError::invalid_data("dueDate", "2025-13-40");
        assert_eq!(err.to_string(), "malformed dueDate value \"2025-13-40\"");
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
