//! Pre-submission checks.
//!
//! These run against the locally known roster only. They are necessary but
//! not sufficient: overlap with existing bookings is decided by the authority.

use crate::error::ValidationError;
use crate::model::{Booking, BookingDraft, Table, WireText};

/// Validate a draft against the roster and turn it into a [`Booking`].
///
/// Checks run in order: completeness, table existence, capacity.
pub fn validate(draft: &BookingDraft, roster: &[Table]) -> Result<Booking, ValidationError> {
    let table_id = present(draft.table_id.as_deref());
    let user_id = present(draft.user_id.as_deref());

    let mut missing = Vec::new();
    if table_id.is_none() {
        missing.push("tableId");
    }
    if draft.date.is_none() {
        missing.push("date");
    }
    if user_id.is_none() {
        missing.push("userId");
    }
    if draft.start_time.is_none() {
        missing.push("startTime");
    }
    if draft.end_time.is_none() {
        missing.push("endTime");
    }
    if draft.guests == 0 {
        missing.push("guests");
    }

    let (Some(table_id), Some(date), Some(user_id), Some(start_time), Some(end_time)) = (
        table_id,
        draft.date,
        user_id,
        draft.start_time,
        draft.end_time,
    ) else {
        return Err(ValidationError::MissingFields(missing));
    };
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let table = roster
        .iter()
        .find(|t| t.table_id == table_id)
        .ok_or_else(|| ValidationError::TableNotFound {
            table_id: table_id.to_string(),
        })?;

    if !table.seats(draft.guests) {
        return Err(ValidationError::CapacityExceeded {
            table_id: table_id.to_string(),
            guests: draft.guests,
            capacity: table.capacity,
        });
    }

    Ok(Booking {
        record_id: None,
        table_id: table_id.to_string(),
        user_id: user_id.to_string(),
        date,
        start_time,
        end_time,
        guests: draft.guests,
        wire: WireText::default(),
    })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
