//! Error types for Tablebook.

use thiserror::Error;

/// A submission rejected before it leaves the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are absent. Holds wire field names.
    #[error("Please fill all fields! (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The selected table is not in the roster.
    #[error("Selected table not found!")]
    TableNotFound { table_id: String },

    /// The party is larger than the table seats.
    #[error("Number of guests exceeds table capacity!")]
    CapacityExceeded {
        table_id: String,
        guests: u32,
        capacity: u32,
    },
}

/// Main error type for booking operations.
#[derive(Error, Debug, Clone)]
pub enum BookingError {
    /// Local validation failed; no request was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The authority declined a well-formed request.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never completed (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The authority answered with a body we could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BookingError {
    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BookingError::Validation(_) => false,
            BookingError::Rejected { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            BookingError::Transport(_) | BookingError::InvalidResponse(_) => true,
        }
    }

    /// Returns true if the error was raised without contacting the authority.
    pub fn is_local(&self) -> bool {
        matches!(self, BookingError::Validation(_))
    }

    /// Returns true for network or decoding failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BookingError::Transport(_) | BookingError::InvalidResponse(_)
        )
    }

    /// The authority's message, if this is a rejection.
    pub fn authority_message(&self) -> Option<&str> {
        match self {
            BookingError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Convenience Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_fields() {
        let err = ValidationError::MissingFields(vec!["tableId", "guests"]);
        assert_eq!(err.to_string(), "Please fill all fields! (missing: tableId, guests)");
    }

    #[test]
    fn test_rejection_displays_message_verbatim() {
        let err = BookingError::Rejected {
            status: 409,
            message: "Table already booked".to_string(),
        };
        assert_eq!(err.to_string(), "Table already booked");
        assert_eq!(err.authority_message(), Some("Table already booked"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(BookingError::Transport("refused".into()).is_retryable());
        assert!(BookingError::InvalidResponse("eof".into()).is_retryable());
        assert!(BookingError::Rejected { status: 503, message: String::new() }.is_retryable());
        assert!(!BookingError::from(ValidationError::TableNotFound {
            table_id: "T9".into()
        })
        .is_retryable());
    }

    #[test]
    fn test_only_validation_is_local() {
        let local = BookingError::from(ValidationError::MissingFields(vec!["date"]));
        assert!(local.is_local());
        assert!(!BookingError::Transport("x".into()).is_local());
    }
}
