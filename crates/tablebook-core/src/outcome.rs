//! The uniform result every orchestrator operation hands back to its view.

use uuid::Uuid;

use crate::error::BookingError;
use crate::types::{OperationKind, OperationStatus};

/// Outcome of one operation invocation.
#[derive(Debug, Clone)]
pub struct Outcome<T = ()> {
    /// Operation id, also recorded on the invocation's log span.
    pub id: Uuid,

    /// Which operation produced this outcome.
    pub operation: OperationKind,

    /// The value on success, or why it failed.
    pub result: Result<T, BookingError>,

    /// The fetched rows were discarded because a newer query superseded them.
    pub superseded: bool,
}

impl<T> Outcome<T> {
    /// A successful outcome.
    pub fn success(id: Uuid, operation: OperationKind, value: T) -> Self {
        Self {
            id,
            operation,
            result: Ok(value),
            superseded: false,
        }
    }

    /// A failed outcome.
    pub fn failure(id: Uuid, operation: OperationKind, error: BookingError) -> Self {
        Self {
            id,
            operation,
            result: Err(error),
            superseded: false,
        }
    }

    /// Mark the outcome as superseded.
    pub fn superseded(mut self, superseded: bool) -> Self {
        self.superseded = superseded;
        self
    }

    /// Terminal status of the invocation.
    pub fn status(&self) -> OperationStatus {
        if self.result.is_ok() {
            OperationStatus::Succeeded
        } else {
            OperationStatus::Failed
        }
    }

    /// Check if the outcome is successful.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Check if the outcome is a failure.
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// Returns true if the view may offer a retry.
    pub fn is_retryable(&self) -> bool {
        match &self.result {
            Ok(_) => false,
            Err(e) => e.is_retryable(),
        }
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&BookingError> {
        self.result.as_ref().err()
    }

    /// The value, if any.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Consume the outcome, keeping the value.
    pub fn into_value(self) -> Option<T> {
        self.result.ok()
    }

    /// Map the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            id: self.id,
            operation: self.operation,
            result: self.result.map(f),
            superseded: self.superseded,
        }
    }

    /// User-facing text for this outcome.
    ///
    /// Validation failures and submit rejections carry their own text;
    /// every other failure uses a fixed message for its operation.
    pub fn message(&self) -> String {
        let err = match &self.result {
            Ok(_) => return success_message(self.operation).to_string(),
            Err(e) => e,
        };

        match (self.operation, err) {
            (_, BookingError::Validation(v)) => v.to_string(),
            (OperationKind::SubmitBooking, BookingError::Rejected { message, .. }) => {
                message.clone()
            }
            (operation, _) => failure_message(operation).to_string(),
        }
    }
}

fn success_message(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::LoadTables => "Tables loaded",
        OperationKind::SubmitBooking => "Booking Successful!",
        OperationKind::QueryByDate | OperationKind::QueryByUser => "Bookings loaded",
        OperationKind::CancelBooking => "Booking successfully canceled!",
        OperationKind::LoadCalendar => "Calendar loaded",
    }
}

fn failure_message(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::LoadTables => "Roster unavailable. Please retry.",
        OperationKind::SubmitBooking => "Booking failed. Please try again.",
        OperationKind::QueryByDate | OperationKind::LoadCalendar => {
            "Failed to fetch bookings. Please retry."
        }
        OperationKind::QueryByUser => "Failed to fetch user bookings.",
        OperationKind::CancelBooking => "Failed to cancel booking. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_submit_rejection_is_verbatim() {
        let outcome: Outcome = Outcome::failure(
            Uuid::new_v4(),
            OperationKind::SubmitBooking,
            BookingError::Rejected {
                status: 409,
                message: "Table already booked".to_string(),
            },
        );
        assert_eq!(outcome.message(), "Table already booked");
        assert_eq!(outcome.status(), OperationStatus::Failed);
        assert!(!outcome.is_retryable());
    }

    #[test]
    fn test_submit_transport_failure_is_generic() {
        let outcome: Outcome = Outcome::failure(
            Uuid::new_v4(),
            OperationKind::SubmitBooking,
            BookingError::Transport("connection refused".to_string()),
        );
        assert_eq!(outcome.message(), "Booking failed. Please try again.");
        assert!(outcome.is_retryable());
    }

    #[test]
    fn test_validation_message() {
        let outcome: Outcome = Outcome::failure(
            Uuid::new_v4(),
            OperationKind::SubmitBooking,
            ValidationError::TableNotFound {
                table_id: "T9".to_string(),
            }
            .into(),
        );
        assert_eq!(outcome.message(), "Selected table not found!");
    }

    #[test]
    fn test_query_rejection_uses_operation_message() {
        let outcome: Outcome<Vec<u8>> = Outcome::failure(
            Uuid::new_v4(),
            OperationKind::QueryByUser,
            BookingError::Rejected {
                status: 500,
                message: "boom".to_string(),
            },
        );
        assert_eq!(outcome.message(), "Failed to fetch user bookings.");
        assert!(outcome.is_retryable());
    }

    #[test]
    fn test_success_and_map() {
        let outcome = Outcome::success(Uuid::new_v4(), OperationKind::QueryByDate, vec![1, 2, 3]);
        assert_eq!(outcome.message(), "Bookings loaded");
        let mapped = outcome.map(|v| v.len());
        assert_eq!(mapped.value(), Some(&3));
        assert_eq!(mapped.status(), OperationStatus::Succeeded);
    }
}
