//! Common types used across Tablebook.

use serde::{Deserialize, Serialize};

/// The operations a view can ask the orchestrator to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Reload the table roster.
    LoadTables,
    /// Validate and submit a new booking.
    SubmitBooking,
    /// Fetch bookings for one date.
    QueryByDate,
    /// Fetch bookings for one user.
    QueryByUser,
    /// Cancel one booking.
    CancelBooking,
    /// Fetch every booking for the calendar.
    LoadCalendar,
}

impl OperationKind {
    /// All operation kinds.
    pub const ALL: [OperationKind; 6] = [
        OperationKind::LoadTables,
        OperationKind::SubmitBooking,
        OperationKind::QueryByDate,
        OperationKind::QueryByUser,
        OperationKind::CancelBooking,
        OperationKind::LoadCalendar,
    ];

    /// Returns true if the operation changes state at the authority.
    pub fn is_mutation(&self) -> bool {
        matches!(self, OperationKind::SubmitBooking | OperationKind::CancelBooking)
    }

    /// Short name used in log spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::LoadTables => "load_tables",
            OperationKind::SubmitBooking => "submit_booking",
            OperationKind::QueryByDate => "query_by_date",
            OperationKind::QueryByUser => "query_by_user",
            OperationKind::CancelBooking => "cancel_booking",
            OperationKind::LoadCalendar => "load_calendar",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// A request is outstanding.
    InFlight,
    /// The invocation completed successfully.
    Succeeded,
    /// The invocation failed.
    Failed,
}

impl OperationStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }

    /// Returns true if a request is outstanding.
    pub fn is_active(&self) -> bool {
        matches!(self, OperationStatus::InFlight)
    }
}
