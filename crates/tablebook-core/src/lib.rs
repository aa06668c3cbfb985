//! # Tablebook Core
//!
//! Entity model, validation rules and outcome types shared by every
//! Tablebook crate.
//!
//! - [`Table`] and [`Booking`] - the roster and reservation values
//! - [`validate`] - pre-submission checks against the roster
//! - [`Outcome`] - the uniform result of every orchestrator operation
//! - [`BookingError`] - the error taxonomy

pub mod error;
pub mod model;
pub mod outcome;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use error::{BookingError, Result, ValidationError};
pub use model::{
    normalize_roster, parse_booking_date, parse_time_of_day, Booking, BookingDraft, BookingKey,
    CalendarEvent, Table, WireText,
};
pub use outcome::Outcome;
pub use types::*;
pub use validation::validate;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{BookingError, Result, ValidationError};
    pub use crate::model::{Booking, BookingDraft, BookingKey, CalendarEvent, Table};
    pub use crate::outcome::Outcome;
    pub use crate::types::{OperationKind, OperationStatus};
    pub use crate::validation::validate;
}
