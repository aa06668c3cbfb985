//! Slices of the availability cache and the tickets that refresh them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One independently refreshable part of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceKind {
    /// The table roster.
    Tables,
    /// Bookings for the selected date.
    ByDate,
    /// Bookings for the selected user.
    ByUser,
    /// Every booking, for the calendar.
    Calendar,
}

impl SliceKind {
    /// All slices.
    pub const ALL: [SliceKind; 4] = [
        SliceKind::Tables,
        SliceKind::ByDate,
        SliceKind::ByUser,
        SliceKind::Calendar,
    ];

    /// Returns true if the slice holds bookings.
    pub fn holds_bookings(&self) -> bool {
        !matches!(self, SliceKind::Tables)
    }
}

/// The input a slice is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// Unscoped slices (roster, calendar).
    All,
    /// A single date.
    Date(NaiveDate),
    /// A single user.
    User(String),
}

impl Selection {
    /// The date, if this is a date selection.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Selection::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The user id, if this is a user selection.
    pub fn as_user(&self) -> Option<&str> {
        match self {
            Selection::User(u) => Some(u),
            _ => None,
        }
    }
}

/// Tag carried by an in-flight query.
///
/// Only the cache writer issues tickets. A result is applied only if its
/// ticket still matches the slice's current selection and is not older
/// than what the slice already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    slice: SliceKind,
    selection: Selection,
    generation: u64,
}

impl RefreshTicket {
    /// The slice this ticket refreshes.
    pub fn slice(&self) -> SliceKind {
        self.slice
    }

    /// The selection the query was issued for.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Issue order within the slice.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Metadata about a slice's current rows.
///
/// Only an applied refresh changes it; issuing a query that later fails or
/// is superseded leaves it as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceMeta {
    /// Selection the current rows reflect.
    pub selection: Option<Selection>,

    /// Generation of the refresh that filled the rows (0 = never filled).
    pub generation: u64,

    /// When the rows were last replaced.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl SliceMeta {
    /// Time since the last replacement, if the slice was ever filled.
    pub fn staleness(&self) -> Option<chrono::Duration> {
        self.refreshed_at.map(|at| Utc::now() - at)
    }
}

/// Rows of one slice plus its refresh bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Slice<T> {
    kind: SliceKind,
    rows: Vec<T>,
    requested: Option<Selection>,
    issued: u64,
    applied: u64,
    applied_selection: Option<Selection>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl<T: Clone> Slice<T> {
    pub(crate) fn new(kind: SliceKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            requested: None,
            issued: 0,
            applied: 0,
            applied_selection: None,
            refreshed_at: None,
        }
    }

    pub(crate) fn begin(&mut self, selection: Selection) -> RefreshTicket {
        self.issued += 1;
        self.requested = Some(selection.clone());
        RefreshTicket {
            slice: self.kind,
            selection,
            generation: self.issued,
        }
    }

    /// Replace the rows wholesale. Returns false if the ticket is stale.
    pub(crate) fn apply(&mut self, ticket: &RefreshTicket, rows: Vec<T>) -> bool {
        if ticket.slice != self.kind
            || self.requested.as_ref() != Some(&ticket.selection)
            || ticket.generation <= self.applied
        {
            return false;
        }
        self.rows = rows;
        self.applied = ticket.generation;
        self.applied_selection = Some(ticket.selection.clone());
        self.refreshed_at = Some(Utc::now());
        true
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&T) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(keep);
        before - self.rows.len()
    }

    pub(crate) fn rows(&self) -> &[T] {
        &self.rows
    }

    pub(crate) fn requested(&self) -> Option<&Selection> {
        self.requested.as_ref()
    }

    pub(crate) fn meta(&self) -> SliceMeta {
        SliceMeta {
            selection: self.applied_selection.clone(),
            generation: self.applied,
            refreshed_at: self.refreshed_at,
        }
    }
}
