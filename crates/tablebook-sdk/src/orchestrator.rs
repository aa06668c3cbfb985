//! Booking lifecycle orchestration.
//!
//! The orchestrator is the only writer of the availability cache. Every
//! operation is one request/response cycle against the authority and ends
//! in an [`Outcome`]; nothing here is fatal and failures never touch the
//! cached rows.

use std::future::Future;

use chrono::NaiveDate;
use tablebook_core::{
    normalize_roster, validate, Booking, BookingDraft, BookingError, CalendarEvent, OperationKind,
    OperationStatus, Outcome, Table, ValidationError,
};
use tablebook_state::{availability_cache, CacheReader, CacheWriter, Selection, SliceKind};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::authority::BookingAuthority;
use crate::client::HttpAuthority;
use crate::config::{ClientConfig, ConfigError};
use crate::tracker::OperationTracker;

/// Coordinates views, the availability cache and the booking authority.
pub struct BookingOrchestrator<A> {
    authority: A,
    cache: CacheWriter,
    reader: CacheReader,
    tracker: OperationTracker,
}

impl BookingOrchestrator<HttpAuthority> {
    /// Create an orchestrator talking HTTP to the configured authority.
    pub fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(HttpAuthority::new(config)?))
    }
}

impl<A: BookingAuthority> BookingOrchestrator<A> {
    /// Create an orchestrator with a fresh, empty cache.
    pub fn new(authority: A) -> Self {
        let (cache, _) = availability_cache();
        Self::with_cache(authority, cache)
    }

    /// Create an orchestrator that owns an existing cache writer.
    pub fn with_cache(authority: A, cache: CacheWriter) -> Self {
        let reader = cache.reader();
        Self {
            authority,
            cache,
            reader,
            tracker: OperationTracker::new(),
        }
    }

    /// A read-only handle on the cache for views.
    pub fn cache(&self) -> CacheReader {
        self.reader.clone()
    }

    /// The authority this orchestrator talks to.
    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Current status of an operation kind.
    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.tracker.status(kind)
    }

    async fn run<T, F>(&self, kind: OperationKind, op: impl FnOnce(Uuid) -> F) -> Outcome<T>
    where
        F: Future<Output = Outcome<T>>,
    {
        let id = Uuid::new_v4();
        let span = info_span!("operation", kind = %kind, op_id = %id);
        let pending = self.tracker.begin(kind);

        let outcome = op(id).instrument(span.clone()).await;

        if let Err(err) = &outcome.result {
            span.in_scope(|| log_failure(kind, err));
        }
        pending.finish(outcome.status());
        outcome
    }

    /// Reload the table roster.
    pub async fn load_tables(&self) -> Outcome<Vec<Table>> {
        self.run(OperationKind::LoadTables, |id| async move {
            let kind = OperationKind::LoadTables;
            let ticket = self.cache.begin_tables().await;

            let fetched = match self.authority.tables().await {
                Ok(tables) => tables,
                Err(e) => return Outcome::failure(id, kind, e),
            };
            let received = fetched.len();
            let tables = normalize_roster(fetched);
            if tables.len() != received {
                warn!(
                    dropped = received - tables.len(),
                    "roster had duplicate or zero-capacity tables"
                );
            }

            let applied = self.cache.apply_tables(&ticket, tables.clone()).await;
            debug!(count = tables.len(), applied, "roster loaded");
            Outcome::success(id, kind, tables).superseded(!applied)
        })
        .await
    }

    /// Validate a draft and submit it to the authority.
    ///
    /// Local validation failures return without any request. On success the
    /// by-date and by-user slices are refreshed if their rows show the new
    /// booking's date or user; clearing the form is left to the caller.
    pub async fn submit_booking(&self, draft: &BookingDraft) -> Outcome<Booking> {
        self.run(OperationKind::SubmitBooking, |id| async move {
            let kind = OperationKind::SubmitBooking;
            let roster = self.reader.tables().await;

            let booking = match validate(draft, &roster) {
                Ok(booking) => booking,
                Err(e) => return Outcome::failure(id, kind, e.into()),
            };

            if let Err(e) = self.authority.create_booking(&booking).await {
                return Outcome::failure(id, kind, e);
            }

            info!(
                table = %booking.table_id,
                date = %booking.date,
                start = %booking.start_time,
                end = %booking.end_time,
                "booking confirmed"
            );
            self.reconcile(&booking, false).await;
            Outcome::success(id, kind, booking)
        })
        .await
    }

    /// Replace the by-date slice with the authority's bookings for `date`.
    pub async fn query_by_date(&self, date: NaiveDate) -> Outcome<Vec<Booking>> {
        self.run(OperationKind::QueryByDate, |id| async move {
            let kind = OperationKind::QueryByDate;
            let ticket = self.cache.begin_by_date(date).await;

            match self.authority.bookings_by_date(date).await {
                Ok(bookings) => {
                    let applied = self.cache.apply_bookings(&ticket, bookings.clone()).await;
                    Outcome::success(id, kind, bookings).superseded(!applied)
                }
                Err(e) => Outcome::failure(id, kind, e),
            }
        })
        .await
    }

    /// Replace the by-user slice with the authority's bookings for `user_id`.
    pub async fn query_by_user(&self, user_id: &str) -> Outcome<Vec<Booking>> {
        self.run(OperationKind::QueryByUser, |id| async move {
            let kind = OperationKind::QueryByUser;
            if user_id.trim().is_empty() {
                return Outcome::failure(
                    id,
                    kind,
                    ValidationError::MissingFields(vec!["userId"]).into(),
                );
            }

            let ticket = self.cache.begin_by_user(user_id).await;
            match self.authority.bookings_by_user(user_id).await {
                Ok(bookings) => {
                    let applied = self.cache.apply_bookings(&ticket, bookings.clone()).await;
                    Outcome::success(id, kind, bookings).superseded(!applied)
                }
                Err(e) => Outcome::failure(id, kind, e),
            }
        })
        .await
    }

    /// Cancel a booking, then re-read the user's bookings from the authority.
    ///
    /// If that re-read fails the cancelled booking is evicted locally so it
    /// does not linger in the cache.
    pub async fn cancel_booking(&self, booking: &Booking) -> Outcome<()> {
        self.run(OperationKind::CancelBooking, |id| async move {
            let kind = OperationKind::CancelBooking;

            if let Err(e) = self.authority.delete_booking(booking).await {
                return Outcome::failure(id, kind, e);
            }
            info!(table = %booking.table_id, date = %booking.date, "booking cancelled");

            if !self.reconcile(booking, true).await {
                let evicted = self.cache.evict(&booking.key()).await;
                warn!(evicted, "post-cancel refresh failed; evicted cancelled booking");
            }
            Outcome::success(id, kind, ())
        })
        .await
    }

    /// Replace the calendar slice with every booking the authority holds.
    pub async fn load_calendar(&self) -> Outcome<Vec<CalendarEvent>> {
        self.run(OperationKind::LoadCalendar, |id| async move {
            let kind = OperationKind::LoadCalendar;
            let ticket = self.cache.begin_calendar().await;

            match self.authority.all_bookings().await {
                Ok(bookings) => {
                    let events = bookings.iter().map(CalendarEvent::from).collect();
                    let applied = self.cache.apply_bookings(&ticket, bookings).await;
                    Outcome::success(id, kind, events).superseded(!applied)
                }
                Err(e) => Outcome::failure(id, kind, e),
            }
        })
        .await
    }

    /// Reload the roster and every requested selection concurrently.
    ///
    /// A selection whose last query failed is retried. Returns one outcome
    /// per reload, carrying the number of rows fetched.
    pub async fn refresh_all(&self) -> Vec<Outcome<usize>> {
        let date = self
            .reader
            .requested(SliceKind::ByDate)
            .await
            .and_then(|s| s.as_date());
        let user = match self.reader.requested(SliceKind::ByUser).await {
            Some(Selection::User(u)) => Some(u),
            _ => None,
        };

        let (tables, by_date, by_user) = tokio::join!(
            self.load_tables(),
            async {
                match date {
                    Some(d) => Some(self.query_by_date(d).await),
                    None => None,
                }
            },
            async {
                match &user {
                    Some(u) => Some(self.query_by_user(u).await),
                    None => None,
                }
            },
        );

        let mut outcomes = vec![tables.map(|t| t.len())];
        outcomes.extend(by_date.map(|o| o.map(|b| b.len())));
        outcomes.extend(by_user.map(|o| o.map(|b| b.len())));
        outcomes
    }

    /// Whether the rows of `kind` currently show `selection`.
    ///
    /// False while a query for another selection is pending, since
    /// re-reading the shown one would supersede it.
    async fn shows(&self, kind: SliceKind, query: OperationKind, selection: &Selection) -> bool {
        if self.reader.meta(kind).await.selection.as_ref() != Some(selection) {
            return false;
        }
        self.reader.requested(kind).await.as_ref() == Some(selection)
            || self.tracker.in_flight(query) == 0
    }

    /// Re-read the slices a mutation of `booking` affects.
    ///
    /// The by-date and by-user slices are refreshed when their rows show the
    /// booking's date or user; the by-user slice always when `force_user` is
    /// set. Returns false if the by-user refresh ran and did not land in the
    /// cache.
    async fn reconcile(&self, booking: &Booking, force_user: bool) -> bool {
        let refresh_date = self
            .shows(
                SliceKind::ByDate,
                OperationKind::QueryByDate,
                &Selection::Date(booking.date),
            )
            .await;
        let refresh_user = force_user
            || self
                .shows(
                    SliceKind::ByUser,
                    OperationKind::QueryByUser,
                    &Selection::User(booking.user_id.clone()),
                )
                .await;
        let refresh_calendar = self.reader.meta(SliceKind::Calendar).await.generation > 0;

        let (by_date, by_user, calendar) = tokio::join!(
            async {
                if refresh_date {
                    Some(self.query_by_date(booking.date).await)
                } else {
                    None
                }
            },
            async {
                if refresh_user {
                    Some(self.query_by_user(&booking.user_id).await)
                } else {
                    None
                }
            },
            async {
                if refresh_calendar {
                    Some(self.load_calendar().await)
                } else {
                    None
                }
            },
        );

        debug!(
            by_date = ?by_date.as_ref().map(|o| o.status()),
            by_user = ?by_user.as_ref().map(|o| o.status()),
            calendar = ?calendar.as_ref().map(|o| o.status()),
            "reconciled after mutation"
        );

        by_user.map_or(true, |o| o.is_success() && !o.superseded)
    }
}

fn log_failure(kind: OperationKind, err: &BookingError) {
    match err {
        BookingError::Validation(e) => debug!(%kind, error = %e, "rejected locally"),
        BookingError::Rejected { status, message } => {
            info!(%kind, status, %message, "authority rejected request")
        }
        BookingError::Transport(_) | BookingError::InvalidResponse(_) => {
            warn!(%kind, error = %err, "request to authority failed")
        }
    }
}
