//! Booking entity model.
//!
//! These are the values exchanged with the booking authority and held by the
//! availability cache. A [`Booking`] has no client-assigned identity; it is
//! identified by its [`BookingKey`].

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A table in the restaurant roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Identifier, unique within the roster.
    pub table_id: String,

    /// Maximum party size the table seats.
    pub capacity: u32,
}

impl Table {
    /// Create a new table.
    pub fn new(table_id: impl Into<String>, capacity: u32) -> Self {
        Self {
            table_id: table_id.into(),
            capacity,
        }
    }

    /// Check whether a party of `guests` fits.
    pub fn seats(&self, guests: u32) -> bool {
        guests <= self.capacity
    }
}

/// Drop roster entries that break the roster invariants.
///
/// Entries with zero capacity are removed, and only the first entry for a
/// given `table_id` is kept.
pub fn normalize_roster(tables: Vec<Table>) -> Vec<Table> {
    let mut seen = HashSet::new();
    tables
        .into_iter()
        .filter(|t| t.capacity >= 1)
        .filter(|t| seen.insert(t.table_id.clone()))
        .collect()
}

/// A reservation of one table for a time window on one date.
///
/// On the wire this is camelCase JSON with `date` as `YYYY-MM-DD` and times
/// as `HH:MM`. Text received from the authority in another accepted form
/// (an RFC 3339 date, `HH:MM:SS`) is kept in [`Booking::wire`] and written
/// back unchanged, so a cancel echoes exactly the tuple the authority holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "WireBooking", into = "WireBooking")]
pub struct Booking {
    /// Opaque record id assigned by the authority, echoed back on cancel.
    pub record_id: Option<String>,

    /// The booked table.
    pub table_id: String,

    /// Caller-supplied user identifier.
    pub user_id: String,

    /// Calendar date of the reservation.
    pub date: NaiveDate,

    /// Start of the reserved window.
    pub start_time: NaiveTime,

    /// End of the reserved window.
    pub end_time: NaiveTime,

    /// Party size.
    pub guests: u32,

    /// Date and time text as received from the authority.
    pub wire: WireText,
}

/// Source text of a booking's date and times.
///
/// A field is only written back while it still parses to the typed value,
/// so editing `date` or the window falls back to the canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireText {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBooking {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    record_id: Option<String>,
    table_id: String,
    user_id: String,
    date: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    guests: u32,
}

impl TryFrom<WireBooking> for Booking {
    type Error = String;

    fn try_from(wire: WireBooking) -> Result<Self, Self::Error> {
        let date = parse_booking_date(&wire.date)
            .ok_or_else(|| format!("invalid booking date: {}", wire.date))?;
        let start_time = parse_time_of_day(&wire.start_time)
            .ok_or_else(|| format!("invalid time of day: {}", wire.start_time))?;
        let end_time = parse_time_of_day(&wire.end_time)
            .ok_or_else(|| format!("invalid time of day: {}", wire.end_time))?;

        Ok(Self {
            record_id: wire.record_id,
            table_id: wire.table_id,
            user_id: wire.user_id,
            date,
            start_time,
            end_time,
            guests: wire.guests,
            wire: WireText {
                date: Some(wire.date),
                start_time: Some(wire.start_time),
                end_time: Some(wire.end_time),
            },
        })
    }
}

impl From<Booking> for WireBooking {
    fn from(booking: Booking) -> Self {
        let WireText {
            date,
            start_time,
            end_time,
        } = booking.wire;

        Self {
            record_id: booking.record_id,
            table_id: booking.table_id,
            user_id: booking.user_id,
            date: date
                .filter(|raw| parse_booking_date(raw) == Some(booking.date))
                .unwrap_or_else(|| booking.date.format("%Y-%m-%d").to_string()),
            start_time: start_time
                .filter(|raw| parse_time_of_day(raw) == Some(booking.start_time))
                .unwrap_or_else(|| booking.start_time.format("%H:%M").to_string()),
            end_time: end_time
                .filter(|raw| parse_time_of_day(raw) == Some(booking.end_time))
                .unwrap_or_else(|| booking.end_time.format("%H:%M").to_string()),
            guests: booking.guests,
        }
    }
}

impl Booking {
    /// The identifying tuple of this booking.
    pub fn key(&self) -> BookingKey {
        BookingKey {
            user_id: self.user_id.clone(),
            table_id: self.table_id.clone(),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Whether this booking is identified by `key`.
    pub fn matches(&self, key: &BookingKey) -> bool {
        self.user_id == key.user_id
            && self.table_id == key.table_id
            && self.date == key.date
            && self.start_time == key.start_time
            && self.end_time == key.end_time
    }

    /// Start of the window as a local date-time.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// End of the window as a local date-time.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}

impl PartialEq for Booking {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.key())
    }
}

impl Eq for Booking {}

impl Hash for Booking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// The tuple that identifies a booking among a user's active bookings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingKey {
    pub user_id: String,
    pub table_id: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDate,
    #[serde(with = "wire_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wire_time")]
    pub end_time: NaiveTime,
}

/// Form state collected by a view before submission.
///
/// Every field may be absent. A draft only becomes a [`Booking`] through
/// [`crate::validation::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub table_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub guests: u32,
}

impl BookingDraft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the table.
    pub fn table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    /// Set the date.
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the user identifier.
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the time window.
    pub fn window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Set the party size.
    pub fn guests(mut self, guests: u32) -> Self {
        self.guests = guests;
        self
    }

    /// Reset every field, as a view does after a confirmed booking.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A booking laid out for a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub record_id: Option<String>,
}

impl From<&Booking> for CalendarEvent {
    fn from(booking: &Booking) -> Self {
        Self {
            title: format!("Table {} - {}", booking.table_id, booking.user_id),
            start: booking.starts_at(),
            end: booking.ends_at(),
            record_id: booking.record_id.clone(),
        }
    }
}

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Parse a booking date written as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_booking_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

mod wire_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_booking_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid booking date: {raw}")))
    }
}

mod wire_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format("%H:%M"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time_of_day(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day: {raw}")))
    }
}
